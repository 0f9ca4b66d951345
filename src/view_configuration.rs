//! The bundle of user-editable view parameters shared by every viewer of a
//! series.

use glam::DVec3;

use crate::colormap::Colormap;
use crate::range::Range;

/// Identifies which part of a [`ViewConfiguration`] changed in a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewParam {
    All,
    Hounsfield,
    Colormap,
    Translation,
    Rotation,
}

/// A configuration published to its consumers along with the part that
/// changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub config: ViewConfiguration,
    pub param: ViewParam,
}

/// Window, legal window span, colormap and geometric transform of a view.
///
/// No validation happens here; the editor producing the configuration keeps
/// the window consistent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewConfiguration {
    hounsfield: Range,
    hounsfield_max_range: Range,
    colormap: Colormap,
    translation: DVec3,
    rotation: DVec3,
}

impl ViewConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current window, in Hounsfield units.
    pub fn hounsfield(&self) -> Range {
        self.hounsfield
    }

    /// Span the window may legally cover, in Hounsfield units.
    pub fn hounsfield_max_range(&self) -> Range {
        self.hounsfield_max_range
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn translation(&self) -> DVec3 {
        self.translation
    }

    /// Rotation angles in degrees about the x, y and z axes.
    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    pub fn set_hounsfield(&mut self, hounsfield: Range, hounsfield_max_range: Range) {
        self.hounsfield = hounsfield;
        self.hounsfield_max_range = hounsfield_max_range;
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    pub fn set_translation(&mut self, translation: DVec3) {
        self.translation = translation;
    }

    pub fn set_rotation(&mut self, rotation: DVec3) {
        self.rotation = rotation;
    }
}
