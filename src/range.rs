use std::fmt;

/// Two ranges whose endpoints differ by less than this are considered equal.
const EQUAL_PRECISION: f64 = 1e-16;

/// A closed interval `[min, max]` used to move values between the
/// normalized `[0, 1]` space, Hounsfield units and raw voxel values.
///
/// No ordering is enforced between `min` and `max`; an inverted range maps
/// relative positions backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct Range {
    min: f64,
    max: f64,
}

impl Range {
    pub const UNIT: Range = Range { min: 0.0, max: 1.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn min_mut(&mut self) -> &mut f64 {
        &mut self.min
    }

    pub fn max_mut(&mut self) -> &mut f64 {
        &mut self.max
    }

    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp `value` into the range.
    pub fn bound(&self, value: f64) -> f64 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Position of `value` relative to the range, `0.0` at `min` and `1.0`
    /// at `max`. With `must_bound` the result is clamped to `[0, 1]`.
    ///
    /// A zero-size range has no meaningful relative position; every value
    /// maps to `0.0`.
    pub fn relative(&self, value: f64, must_bound: bool) -> f64 {
        let size = self.size();
        let pos = if size == 0.0 {
            0.0
        } else {
            (value - self.min) / size
        };
        if must_bound {
            Range::UNIT.bound(pos)
        } else {
            pos
        }
    }

    /// Inverse of [`Range::relative`]. With `must_bound` the result is
    /// clamped to the range.
    pub fn absolute(&self, value: f64, must_bound: bool) -> f64 {
        let pos = self.min + value * self.size();
        if must_bound { self.bound(pos) } else { pos }
    }

    /// Apply [`Range::relative`] to both endpoints of `range`.
    pub fn relative_range(&self, range: Range, must_bound: bool) -> Range {
        Range::new(
            self.relative(range.min, must_bound),
            self.relative(range.max, must_bound),
        )
    }

    /// Apply [`Range::absolute`] to both endpoints of `range`.
    pub fn absolute_range(&self, range: Range, must_bound: bool) -> Range {
        Range::new(
            self.absolute(range.min, must_bound),
            self.absolute(range.max, must_bound),
        )
    }

    /// Smallest range containing both `self` and `other`.
    pub fn union(&self, other: Range) -> Range {
        Range::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Map both endpoints through `f`.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Range {
        Range::new(f(self.min), f(self.max))
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        (self.min - other.min).abs() < EQUAL_PRECISION
            && (self.max - other.max).abs() < EQUAL_PRECISION
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
