use std::path::Path;

use super::{Colormap, ColormapError, InterpolationMode};
use crate::color::Rgb;
use crate::signal::{ConnectionId, Signal};

/// Change notifications emitted by an [`ObservedColormap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColormapEvent {
    PointAdded { index: usize, start: f64, color: Rgb },
    PointModified { index: usize, start: f64, color: Rgb },
    InterpolationModeChanged(InterpolationMode),
    /// The colormap changed as a whole (cleared, replaced or loaded).
    Modified,
}

/// A [`Colormap`] being edited, notifying its observers after every
/// mutation that took effect. Rejected mutations emit nothing.
#[derive(Debug, Default)]
pub struct ObservedColormap {
    colormap: Colormap,
    changed: Signal<ColormapEvent>,
}

impl ObservedColormap {
    pub fn new(colormap: Colormap) -> Self {
        Self {
            colormap,
            changed: Signal::new(),
        }
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn connect(&mut self, slot: impl FnMut(&ColormapEvent) + 'static) -> ConnectionId {
        self.changed.connect(slot)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.changed.disconnect(id)
    }

    pub fn add_color(&mut self, start: f64, color: Rgb) -> Option<usize> {
        let index = self.colormap.add_color(start, color)?;
        self.changed
            .emit(&ColormapEvent::PointAdded { index, start, color });
        Some(index)
    }

    pub fn set_start_at(&mut self, index: usize, start: f64) -> Option<usize> {
        let index = self.colormap.set_start_at(index, start)?;
        self.emit_point_modified(index);
        Some(index)
    }

    pub fn set_color_at(&mut self, index: usize, color: Rgb) -> bool {
        if !self.colormap.set_color_at(index, color) {
            return false;
        }
        self.emit_point_modified(index);
        true
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.colormap.set_interpolation_mode(mode);
        self.changed
            .emit(&ColormapEvent::InterpolationModeChanged(mode));
    }

    pub fn clear(&mut self) {
        self.colormap.clear();
        self.changed.emit(&ColormapEvent::Modified);
    }

    /// Replace the whole colormap, keeping the observers.
    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
        self.changed.emit(&ColormapEvent::Modified);
    }

    /// Load a LUT file; observers are notified whether or not it succeeds
    /// since a failed load still clears the colormap.
    pub fn load_from_lut_file(&mut self, path: impl AsRef<Path>) -> Result<(), ColormapError> {
        let result = self.colormap.load_from_lut_file(path);
        self.changed.emit(&ColormapEvent::Modified);
        result
    }

    fn emit_point_modified(&mut self, index: usize) {
        if let Some(point) = self.colormap.points().get(index).copied() {
            self.changed.emit(&ColormapEvent::PointModified {
                index,
                start: point.start,
                color: point.color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording() -> (ObservedColormap, Rc<RefCell<Vec<ColormapEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut observed = ObservedColormap::default();
        let sink = Rc::clone(&events);
        observed.connect(move |event| sink.borrow_mut().push(*event));
        (observed, events)
    }

    #[test]
    fn mutations_emit_matching_events() {
        let (mut observed, events) = recording();

        observed.add_color(0.5, Rgb::WHITE);
        observed.add_color(0.2, Rgb::BLACK);
        observed.set_start_at(0, 0.9);
        observed.set_interpolation_mode(InterpolationMode::Constant);
        observed.clear();

        assert_eq!(
            *events.borrow(),
            vec![
                ColormapEvent::PointAdded { index: 0, start: 0.5, color: Rgb::WHITE },
                ColormapEvent::PointAdded { index: 0, start: 0.2, color: Rgb::BLACK },
                ColormapEvent::PointModified { index: 1, start: 0.9, color: Rgb::BLACK },
                ColormapEvent::InterpolationModeChanged(InterpolationMode::Constant),
                ColormapEvent::Modified,
            ]
        );
    }

    #[test]
    fn rejected_mutations_are_silent() {
        let (mut observed, events) = recording();

        assert_eq!(observed.add_color(1.5, Rgb::WHITE), None);
        assert_eq!(observed.set_start_at(0, 0.5), None);
        assert!(!observed.set_color_at(3, Rgb::WHITE));

        assert!(events.borrow().is_empty());
        assert_eq!(observed.colormap().count(), 0);
    }

    #[test]
    fn failed_lut_load_still_notifies_clear() {
        let (mut observed, events) = recording();
        observed.add_color(0.5, Rgb::WHITE);

        let dir = tempfile::tempdir().unwrap();
        assert!(observed.load_from_lut_file(dir.path().join("nope.lut")).is_err());

        assert!(observed.colormap().is_empty());
        assert_eq!(events.borrow().last(), Some(&ColormapEvent::Modified));
    }
}
