//! Sampled transfer functions handed to a rendering backend.
//!
//! A [`TransferFunction`] is a list of `(x, value)` nodes over a scalar
//! domain. Values between nodes are linearly interpolated and values outside
//! the node span are clamped to the first or last node. Several nodes may
//! share the same `x`; they keep their insertion order, which lets a
//! function express a hard step.

use crate::color::Rgb;
use crate::range::Range;

/// A value that can be linearly interpolated between two nodes.
pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for Rgb {
    fn interpolate(self, other: Self, t: f64) -> Self {
        self.lerp(other, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<V> {
    pub x: f64,
    pub value: V,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction<V> {
    nodes: Vec<Node<V>>,
}

/// Domain to RGB.
pub type ColorFunction = TransferFunction<Rgb>;

/// Domain to opacity in `[0, 1]`.
pub type OpacityFunction = TransferFunction<f64>;

impl<V> Default for TransferFunction<V> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<V: Interpolate> TransferFunction<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, keeping nodes sorted by `x`. A node whose `x` equals
    /// existing nodes goes after them. Returns the node index.
    pub fn add_point(&mut self, x: f64, value: V) -> usize {
        let index = self.nodes.partition_point(|node| node.x <= x);
        self.nodes.insert(index, Node { x, value });
        index
    }

    pub fn nodes(&self) -> &[Node<V>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Replace the value of an existing node. Returns `false` when `index`
    /// is out of bounds.
    pub fn set_node_value(&mut self, index: usize, value: V) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.value = value;
                true
            }
            None => false,
        }
    }

    /// Span covered by the nodes.
    pub fn range(&self) -> Option<Range> {
        let first = self.nodes.first()?;
        let last = self.nodes.last()?;
        Some(Range::new(first.x, last.x))
    }

    /// Evaluate the function at `x`. `None` when the function has no node.
    /// A NaN `x` gets the value of the first node.
    pub fn value_at(&self, x: f64) -> Option<V> {
        let first = self.nodes.first()?;
        let last = self.nodes.last()?;
        if x <= first.x {
            return Some(first.value);
        }
        if x >= last.x {
            return Some(last.value);
        }

        // first node strictly after x; a NaN x passed both checks above and
        // sits before every node
        let upper = self.nodes.partition_point(|node| node.x <= x);
        let Some(left) = upper.checked_sub(1).and_then(|i| self.nodes.get(i)) else {
            return Some(first.value);
        };
        let Some(right) = self.nodes.get(upper) else {
            return Some(last.value);
        };
        let span = right.x - left.x;
        if span <= 0.0 {
            return Some(right.value);
        }
        Some(left.value.interpolate(right.value, (x - left.x) / span))
    }

    /// Evaluate the function at `count` evenly spaced positions over `range`.
    pub fn sample_over(&self, range: Range, count: usize) -> Vec<V> {
        if count == 0 {
            return Vec::new();
        }
        let step = if count > 1 {
            range.size() / (count - 1) as f64
        } else {
            0.0
        };
        (0..count)
            .filter_map(|i| self.value_at(range.min() + step * i as f64))
            .collect()
    }

    /// Evaluate the function at `count` evenly spaced positions over its own
    /// node span.
    pub fn sample(&self, count: usize) -> Vec<V> {
        match self.range() {
            Some(range) => self.sample_over(range, count),
            None => Vec::new(),
        }
    }
}
