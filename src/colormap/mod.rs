//! Piecewise colour mappings over the normalized `[0, 1]` space.
//!
//! A [`Colormap`] holds control points sorted by their start position and
//! turns them into a [`ColorFunction`] over a physical domain with
//! [`Colormap::compute_color_function`].

pub mod colorbar;
pub mod lut;
pub mod observed;

pub use lut::ColormapError;
pub use observed::{ColormapEvent, ObservedColormap};

use crate::color::Rgb;
use crate::range::Range;
use crate::transfer_function::ColorFunction;

/// Offset applied to anchors sharing a boundary so that the colour function
/// never receives two unrelated nodes at the exact same position.
const ANCHOR_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Control points span the current window; colours are interpolated
    /// between points and held flat outside the window.
    #[default]
    Linear,
    /// Control points span the whole domain; each colour is held until the
    /// next point and fades in from black across the window.
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub start: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Colormap {
    points: Vec<ControlPoint>,
    interpolation_mode: InterpolationMode,
}

fn is_valid_start(start: f64) -> bool {
    (0.0..=1.0).contains(&start)
}

impl Colormap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(interpolation_mode: InterpolationMode) -> Self {
        Self {
            points: Vec::new(),
            interpolation_mode,
        }
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn start_at(&self, index: usize) -> Option<f64> {
        self.points.get(index).map(|point| point.start)
    }

    pub fn color_at(&self, index: usize) -> Option<Rgb> {
        self.points.get(index).map(|point| point.color)
    }

    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.interpolation_mode
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolation_mode = mode;
    }

    /// Insert a control point at its sorted position, after any point with
    /// the same start. Returns the assigned index, or `None` when `start`
    /// lies outside `[0, 1]` (the colormap is left untouched).
    pub fn add_color(&mut self, start: f64, color: Rgb) -> Option<usize> {
        if !is_valid_start(start) {
            return None;
        }
        let index = self.points.partition_point(|point| point.start <= start);
        self.points.insert(index, ControlPoint { start, color });
        Some(index)
    }

    /// Move the control point at `index` to `start`. The point is re-sorted
    /// among its neighbours and its new index is returned. Returns `None`
    /// when `start` lies outside `[0, 1]` or `index` does not exist.
    pub fn set_start_at(&mut self, index: usize, start: f64) -> Option<usize> {
        if !is_valid_start(start) || index >= self.points.len() {
            return None;
        }
        let mut point = self.points.remove(index);
        point.start = start;
        let new_index = self.points.partition_point(|p| p.start <= start);
        self.points.insert(new_index, point);
        Some(new_index)
    }

    /// Returns `false` when `index` does not exist.
    pub fn set_color_at(&mut self, index: usize, color: Rgb) -> bool {
        match self.points.get_mut(index) {
            Some(point) => {
                point.color = color;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Append a point known to come after every existing point.
    fn push_sorted(&mut self, start: f64, color: Rgb) {
        if is_valid_start(start) {
            debug_assert!(self.points.last().is_none_or(|last| last.start <= start));
            self.points.push(ControlPoint { start, color });
        }
    }

    /// Colour in effect at `position` without interpolation.
    ///
    /// Black before the first point, the colour of the last point starting
    /// at or before `position` otherwise, and white for an empty colormap.
    /// A NaN position is black.
    pub fn color_from_position(&self, position: f64) -> Rgb {
        let Some(first) = self.points.first() else {
            return Rgb::WHITE;
        };
        if position < first.start {
            return Rgb::BLACK;
        }
        let after = self.points.partition_point(|point| point.start <= position);
        // only a NaN position has no point at or before it
        after
            .checked_sub(1)
            .map_or(Rgb::BLACK, |index| self.points[index].color)
    }

    /// Build the colour function over `on_range` (the whole domain) with the
    /// control points placed according to the current window
    /// `on_range_window`.
    pub fn compute_color_function(&self, on_range: Range, on_range_window: Range) -> ColorFunction {
        let mut func = ColorFunction::new();

        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            // grayscale ramp across the window
            func.add_point(on_range.min() - ANCHOR_EPSILON, Rgb::BLACK);
            func.add_point(on_range_window.min() - ANCHOR_EPSILON, Rgb::BLACK);
            func.add_point(on_range_window.max() + ANCHOR_EPSILON, Rgb::WHITE);
            func.add_point(on_range.max() + ANCHOR_EPSILON, Rgb::WHITE);
            return func;
        };

        match self.interpolation_mode {
            InterpolationMode::Linear => {
                func.add_point(on_range.min() - ANCHOR_EPSILON, first.color);
                func.add_point(on_range_window.min() - ANCHOR_EPSILON, first.color);
                for point in &self.points {
                    func.add_point(on_range_window.absolute(point.start, false), point.color);
                }
                func.add_point(on_range_window.max() + ANCHOR_EPSILON, last.color);
                func.add_point(on_range.max() + ANCHOR_EPSILON, last.color);
            }
            InterpolationMode::Constant => {
                func.add_point(on_range.min() - ANCHOR_EPSILON, Rgb::BLACK);
                func.add_point(on_range_window.min() - ANCHOR_EPSILON, Rgb::BLACK);
                func.add_point(
                    on_range.absolute(first.start, false) - ANCHOR_EPSILON,
                    Rgb::BLACK,
                );

                for (i, point) in self.points.iter().enumerate() {
                    let start = on_range.absolute(point.start, false);
                    if start >= on_range_window.min() {
                        let faded = point
                            .color
                            .change_value(on_range_window.relative(start, true));
                        func.add_point(start, faded);
                    }
                    // hold the colour until just before the next point
                    if let Some(next) = self.points.get(i + 1) {
                        let end = on_range.absolute(next.start, false);
                        if end >= on_range_window.min() {
                            let faded = point
                                .color
                                .change_value(on_range_window.relative(end, true));
                            func.add_point(end - ANCHOR_EPSILON, faded);
                        }
                    }
                }

                let above_window = self
                    .color_from_position(on_range.relative(on_range_window.max(), true))
                    .change_value(1.0);
                func.add_point(on_range_window.max() + ANCHOR_EPSILON, above_window);
                let end = self.color_from_position(1.0).change_value(1.0);
                func.add_point(on_range.max() + ANCHOR_EPSILON, end);
            }
        }

        func
    }
}
