use std::rc::Rc;

use tracing::debug;

use crate::view_configuration::ViewConfiguration;

use super::{Revisions, SharedSeriesViewer, Viewer, ViewerRole};

/// Fused view drawing the props of several series viewers together.
///
/// Each linked viewer receives the broadcasts of its own series, so the
/// update hooks here only redraw.
#[derive(Debug)]
pub struct MergedViewer {
    role: ViewerRole,
    linked: Vec<SharedSeriesViewer>,
    current_slice: f64,
    revisions: Revisions,
}

impl MergedViewer {
    pub fn new(role: ViewerRole) -> Self {
        Self {
            role,
            linked: Vec::new(),
            current_slice: 0.0,
            revisions: Revisions::default(),
        }
    }

    pub fn role(&self) -> ViewerRole {
        self.role
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub fn linked(&self) -> &[SharedSeriesViewer] {
        &self.linked
    }

    pub fn link_series_viewer(&mut self, viewer: SharedSeriesViewer) {
        self.linked.push(viewer);
        debug!("{:?} merged viewer links {} viewers", self.role, self.linked.len());
        self.redraw();
    }

    /// Returns whether `viewer` was linked.
    pub fn unlink_series_viewer(&mut self, viewer: &SharedSeriesViewer) -> bool {
        let Some(position) = self.linked.iter().position(|v| Rc::ptr_eq(v, viewer)) else {
            return false;
        };
        self.linked.remove(position);
        self.redraw();
        true
    }

    /// Lowest slice position over the linked viewers, `0` when none is.
    pub fn min_slice(&self) -> f64 {
        self.linked
            .iter()
            .map(|viewer| viewer.borrow().min_slice())
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Highest slice position over the linked viewers, `0` when none is.
    pub fn max_slice(&self) -> f64 {
        self.linked
            .iter()
            .map(|viewer| viewer.borrow().max_slice())
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    pub fn current_slice(&self) -> f64 {
        self.current_slice
    }

    /// Move every linked slice viewer to `position`.
    pub fn change_current_slice(&mut self, position: f64) {
        self.current_slice = position;
        for viewer in &self.linked {
            if let Some(slice) = viewer.borrow_mut().as_slice_mut() {
                slice.change_current_slice(position);
            }
        }
        self.redraw();
    }
}

impl Viewer for MergedViewer {
    fn update_hounsfield(&mut self, _config: &ViewConfiguration) {}

    fn update_colormap(&mut self, _config: &ViewConfiguration) {}

    fn update_translation(&mut self, _config: &ViewConfiguration) {}

    fn update_rotation(&mut self, _config: &ViewConfiguration) {}

    fn redraw(&mut self) {
        self.revisions.redraws += 1;
    }
}
