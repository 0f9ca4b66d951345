//! Editing surfaces producing view configuration broadcasts.

pub mod hounsfield;

pub use hounsfield::HounsfieldControl;

use std::collections::BTreeSet;

use glam::DVec3;
use tracing::debug;

use crate::signal::{ConnectionId, Signal};
use crate::view_configuration::{ViewConfiguration, ViewParam, ViewUpdate};

/// Translation bound on each axis, in millimetres.
pub const MAX_TRANSLATION: f64 = 200.0;

/// Which part of the configuration an editor owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    HounsfieldColormap,
    TranslationRotation,
    Full,
}

impl EditorKind {
    /// Parameters broadcast on every change, in broadcast order.
    pub fn useful_params(self) -> BTreeSet<ViewParam> {
        match self {
            EditorKind::HounsfieldColormap => [ViewParam::Hounsfield, ViewParam::Colormap].into(),
            EditorKind::TranslationRotation => {
                [ViewParam::Translation, ViewParam::Rotation].into()
            }
            EditorKind::Full => [ViewParam::All].into(),
        }
    }

    fn edits_transform(self) -> bool {
        matches!(self, EditorKind::TranslationRotation | EditorKind::Full)
    }
}

/// A live configuration being edited and the last committed one.
///
/// Every edit is broadcast while real-time updates are on. Accepting
/// commits the live configuration; rejecting or resetting restores the
/// committed one. Both always broadcast, so listeners end up on the
/// committed state even after edits made with real-time updates off.
#[derive(Debug)]
pub struct ViewConfigurationEditor {
    kind: EditorKind,
    live: ViewConfiguration,
    committed: ViewConfiguration,
    real_time: bool,
    changed: Signal<ViewUpdate>,
}

impl ViewConfigurationEditor {
    pub fn new(kind: EditorKind, initial: ViewConfiguration) -> Self {
        Self {
            kind,
            committed: initial.clone(),
            live: initial,
            real_time: true,
            changed: Signal::new(),
        }
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    pub fn live(&self) -> &ViewConfiguration {
        &self.live
    }

    pub fn committed(&self) -> &ViewConfiguration {
        &self.committed
    }

    pub fn is_real_time(&self) -> bool {
        self.real_time
    }

    pub fn connect(&mut self, slot: impl FnMut(&ViewUpdate) + 'static) -> ConnectionId {
        self.changed.connect(slot)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.changed.disconnect(id)
    }

    /// Change the live configuration, then broadcast it when real-time
    /// updates are on.
    pub fn edit(&mut self, edit: impl FnOnce(&mut ViewConfiguration)) {
        edit(&mut self.live);
        if self.kind.edits_transform() {
            let translation = self.live.translation();
            self.live.set_translation(translation.clamp(
                DVec3::splat(-MAX_TRANSLATION),
                DVec3::splat(MAX_TRANSLATION),
            ));
            let rotation = self.live.rotation();
            self.live.set_rotation(DVec3::new(
                rotation.x.rem_euclid(360.0),
                rotation.y.rem_euclid(360.0),
                rotation.z.rem_euclid(360.0),
            ));
        }
        self.send_current(true);
    }

    /// Turning real-time updates on sends the live configuration at once.
    pub fn set_real_time(&mut self, real_time: bool) {
        self.real_time = real_time;
        self.send_current(true);
    }

    /// Broadcast the live configuration once per useful parameter. With
    /// `if_real_time`, nothing is sent while real-time updates are off.
    /// Returns whether anything was sent.
    pub fn send_current(&mut self, if_real_time: bool) -> bool {
        if if_real_time && !self.real_time {
            return false;
        }
        for param in self.kind.useful_params() {
            self.changed.emit(&ViewUpdate {
                config: self.live.clone(),
                param,
            });
        }
        true
    }

    pub fn accept(&mut self) {
        debug!("{:?} editor accepted", self.kind);
        self.committed = self.live.clone();
        self.send_current(false);
    }

    pub fn reject(&mut self) {
        debug!("{:?} editor rejected", self.kind);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.live = self.committed.clone();
        self.send_current(false);
    }
}
