//! Consumers of view configuration broadcasts.
//!
//! Every viewer reacts to a [`ViewParam`] by recomputing only the derived
//! state tied to it:
//!
//! | param | derived state |
//! |---|---|
//! | `Hounsfield` | opacity function (volume) and colour function |
//! | `Colormap` | colour function |
//! | `Translation` | position (and slice offset for slices) |
//! | `Rotation` | orientation |
//!
//! `All` runs the four updates in that order so the colour function is
//! always computed with the window that was just applied.

mod merged;
mod slice;
mod volume;

pub use merged::MergedViewer;
pub use slice::SliceViewer;
pub use volume::VolumeViewer;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use glam::DVec3;
use tracing::trace;

use crate::enums::Orientation;
use crate::series::SeriesData;
use crate::view_configuration::{ViewConfiguration, ViewParam};

/// Counters bumped each time a piece of derived state is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revisions {
    pub opacity: u64,
    pub color: u64,
    pub transform: u64,
    pub redraws: u64,
}

/// Where a viewer sits in a display: the 3D view or one of the slice views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerRole {
    Volume,
    Slice(Orientation),
}

impl ViewerRole {
    /// The four viewers of a display, in display order.
    pub const ALL: [ViewerRole; 4] = [
        ViewerRole::Volume,
        ViewerRole::Slice(Orientation::Sagittal),
        ViewerRole::Slice(Orientation::Coronal),
        ViewerRole::Slice(Orientation::Axial),
    ];

    pub fn index(self) -> usize {
        match self {
            ViewerRole::Volume => 0,
            ViewerRole::Slice(Orientation::Sagittal) => 1,
            ViewerRole::Slice(Orientation::Coronal) => 2,
            ViewerRole::Slice(Orientation::Axial) => 3,
        }
    }
}

/// Position and orientation (degrees about x, y, z) of a rendered prop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: DVec3,
    pub orientation: DVec3,
}

pub trait Viewer {
    fn update_hounsfield(&mut self, config: &ViewConfiguration);
    fn update_colormap(&mut self, config: &ViewConfiguration);
    fn update_translation(&mut self, config: &ViewConfiguration);
    fn update_rotation(&mut self, config: &ViewConfiguration);

    /// Ask the rendering backend to draw the current state.
    fn redraw(&mut self);

    /// Apply the part of `config` named by `param`, then redraw once.
    fn update_view(&mut self, config: &ViewConfiguration, param: ViewParam) {
        trace!("Viewer update for {param:?}");
        match param {
            ViewParam::All => {
                self.update_hounsfield(config);
                self.update_colormap(config);
                self.update_translation(config);
                self.update_rotation(config);
            }
            ViewParam::Hounsfield => self.update_hounsfield(config),
            ViewParam::Colormap => self.update_colormap(config),
            ViewParam::Translation => self.update_translation(config),
            ViewParam::Rotation => self.update_rotation(config),
        }
        self.redraw();
    }
}

/// A viewer showing a single series.
#[derive(Debug)]
pub enum SeriesViewer {
    Volume(VolumeViewer),
    Slice(SliceViewer),
}

pub type SharedSeriesViewer = Rc<RefCell<SeriesViewer>>;

impl SeriesViewer {
    pub fn new(series: Arc<SeriesData>, role: ViewerRole) -> Self {
        match role {
            ViewerRole::Volume => SeriesViewer::Volume(VolumeViewer::new(series)),
            ViewerRole::Slice(orientation) => {
                SeriesViewer::Slice(SliceViewer::new(series, orientation))
            }
        }
    }

    pub fn shared(self) -> SharedSeriesViewer {
        Rc::new(RefCell::new(self))
    }

    pub fn role(&self) -> ViewerRole {
        match self {
            SeriesViewer::Volume(_) => ViewerRole::Volume,
            SeriesViewer::Slice(viewer) => ViewerRole::Slice(viewer.orientation()),
        }
    }

    pub fn revisions(&self) -> Revisions {
        match self {
            SeriesViewer::Volume(viewer) => viewer.revisions(),
            SeriesViewer::Slice(viewer) => viewer.revisions(),
        }
    }

    pub fn prop_opacity(&self) -> f64 {
        match self {
            SeriesViewer::Volume(viewer) => viewer.prop_opacity(),
            SeriesViewer::Slice(viewer) => viewer.prop_opacity(),
        }
    }

    pub fn set_prop_opacity(&mut self, opacity: f64) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.set_prop_opacity(opacity),
            SeriesViewer::Slice(viewer) => viewer.set_prop_opacity(opacity),
        }
    }

    /// A fused viewer is drawn by the merged display at half opacity instead
    /// of by its own display.
    pub fn allow_fusion(&mut self, allow: bool) {
        self.set_prop_opacity(if allow { 0.5 } else { 1.0 });
        match self {
            SeriesViewer::Volume(viewer) => viewer.in_own_scene = !allow,
            SeriesViewer::Slice(viewer) => viewer.in_own_scene = !allow,
        }
    }

    pub fn in_own_scene(&self) -> bool {
        match self {
            SeriesViewer::Volume(viewer) => viewer.in_own_scene,
            SeriesViewer::Slice(viewer) => viewer.in_own_scene,
        }
    }

    /// Lowest slice position, `0` for the volume viewer.
    pub fn min_slice(&self) -> f64 {
        match self {
            SeriesViewer::Volume(_) => 0.0,
            SeriesViewer::Slice(viewer) => viewer.slice_range().min(),
        }
    }

    /// Highest slice position, `0` for the volume viewer.
    pub fn max_slice(&self) -> f64 {
        match self {
            SeriesViewer::Volume(_) => 0.0,
            SeriesViewer::Slice(viewer) => viewer.slice_range().max(),
        }
    }

    pub fn as_slice(&self) -> Option<&SliceViewer> {
        match self {
            SeriesViewer::Slice(viewer) => Some(viewer),
            SeriesViewer::Volume(_) => None,
        }
    }

    pub fn as_slice_mut(&mut self) -> Option<&mut SliceViewer> {
        match self {
            SeriesViewer::Slice(viewer) => Some(viewer),
            SeriesViewer::Volume(_) => None,
        }
    }

    pub fn as_volume(&self) -> Option<&VolumeViewer> {
        match self {
            SeriesViewer::Volume(viewer) => Some(viewer),
            SeriesViewer::Slice(_) => None,
        }
    }
}

impl Viewer for SeriesViewer {
    fn update_hounsfield(&mut self, config: &ViewConfiguration) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.update_hounsfield(config),
            SeriesViewer::Slice(viewer) => viewer.update_hounsfield(config),
        }
    }

    fn update_colormap(&mut self, config: &ViewConfiguration) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.update_colormap(config),
            SeriesViewer::Slice(viewer) => viewer.update_colormap(config),
        }
    }

    fn update_translation(&mut self, config: &ViewConfiguration) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.update_translation(config),
            SeriesViewer::Slice(viewer) => viewer.update_translation(config),
        }
    }

    fn update_rotation(&mut self, config: &ViewConfiguration) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.update_rotation(config),
            SeriesViewer::Slice(viewer) => viewer.update_rotation(config),
        }
    }

    fn redraw(&mut self) {
        match self {
            SeriesViewer::Volume(viewer) => viewer.redraw(),
            SeriesViewer::Slice(viewer) => viewer.redraw(),
        }
    }
}
