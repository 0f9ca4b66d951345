//! Displays own the four viewers of a series, or fuse several series into
//! one set of viewers.
//!
//! A [`SeriesDisplay`] is the consumer of the view configuration broadcasts
//! of its series: it applies each update to its four viewers and then
//! republishes it, so a [`MergedDisplay`] fusing the series can redraw.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info};

use crate::enums::Orientation;
use crate::series::SeriesData;
use crate::signal::{ConnectionId, Signal};
use crate::view_configuration::{ViewConfiguration, ViewParam, ViewUpdate};
use crate::viewer::{MergedViewer, SeriesViewer, SharedSeriesViewer, Viewer, ViewerRole};

pub type SharedSeriesDisplay = Rc<RefCell<SeriesDisplay>>;

/// Volume and three slice viewers of one series.
#[derive(Debug)]
pub struct SeriesDisplay {
    series: Arc<SeriesData>,
    title: String,
    viewers: [SharedSeriesViewer; 4],
    fused: bool,
    changed: Signal<ViewUpdate>,
}

impl SeriesDisplay {
    pub fn new(series: Arc<SeriesData>) -> Self {
        let viewers = ViewerRole::ALL.map(|role| SeriesViewer::new(series.clone(), role).shared());
        let title = series.title();
        info!("Built display for {title}");
        Self {
            series,
            title,
            viewers,
            fused: false,
            changed: Signal::new(),
        }
    }

    pub fn shared(self) -> SharedSeriesDisplay {
        Rc::new(RefCell::new(self))
    }

    pub fn series(&self) -> &Arc<SeriesData> {
        &self.series
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn viewer(&self, role: ViewerRole) -> &SharedSeriesViewer {
        &self.viewers[role.index()]
    }

    pub fn viewers(&self) -> &[SharedSeriesViewer; 4] {
        &self.viewers
    }

    /// Apply an edited configuration to the four viewers, then notify the
    /// listeners of this display.
    pub fn update_view_configuration(&mut self, config: &ViewConfiguration, param: ViewParam) {
        debug!("{} applies {param:?}", self.title);
        for viewer in &self.viewers {
            viewer.borrow_mut().update_view(config, param);
        }
        self.changed.emit(&ViewUpdate {
            config: config.clone(),
            param,
        });
    }

    pub fn connect(&mut self, slot: impl FnMut(&ViewUpdate) + 'static) -> ConnectionId {
        self.changed.connect(slot)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.changed.disconnect(id)
    }

    /// Opacity of the props, read from the volume viewer.
    pub fn props_opacity(&self) -> f64 {
        self.viewer(ViewerRole::Volume).borrow().prop_opacity()
    }

    pub fn set_props_opacity(&mut self, opacity: f64) {
        for viewer in &self.viewers {
            viewer.borrow_mut().set_prop_opacity(opacity);
        }
    }

    pub fn allow_fusion(&mut self, allow: bool) {
        for viewer in &self.viewers {
            viewer.borrow_mut().allow_fusion(allow);
        }
        self.fused = allow;
    }

    pub fn is_fused(&self) -> bool {
        self.fused
    }

    pub fn change_current_slice(&mut self, orientation: Orientation, position: f64) {
        if let Some(slice) = self
            .viewer(ViewerRole::Slice(orientation))
            .borrow_mut()
            .as_slice_mut()
        {
            slice.change_current_slice(position);
        }
    }
}

#[derive(Debug)]
struct FusedSeries {
    display: SharedSeriesDisplay,
    connection: ConnectionId,
}

/// Several series drawn together, each keeping its own configuration.
#[derive(Debug)]
pub struct MergedDisplay {
    title: String,
    viewers: [Rc<RefCell<MergedViewer>>; 4],
    series: Vec<FusedSeries>,
    selected: Option<usize>,
}

impl MergedDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            viewers: ViewerRole::ALL.map(|role| Rc::new(RefCell::new(MergedViewer::new(role)))),
            series: Vec::new(),
            selected: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn viewer(&self, role: ViewerRole) -> &Rc<RefCell<MergedViewer>> {
        &self.viewers[role.index()]
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn contains(&self, display: &SharedSeriesDisplay) -> bool {
        self.position(display).is_some()
    }

    fn position(&self, display: &SharedSeriesDisplay) -> Option<usize> {
        self.series
            .iter()
            .position(|fused| Rc::ptr_eq(&fused.display, display))
    }

    /// Fuse `display` into this one. Returns `false` when it already is.
    pub fn add(&mut self, display: &SharedSeriesDisplay) -> bool {
        if self.contains(display) {
            return false;
        }

        let viewers = self.viewers.clone();
        let connection = {
            let mut series_display = display.borrow_mut();
            series_display.allow_fusion(true);
            for (merged, viewer) in self.viewers.iter().zip(series_display.viewers()) {
                merged.borrow_mut().link_series_viewer(viewer.clone());
            }
            series_display.connect(move |update| {
                for merged in &viewers {
                    merged.borrow_mut().update_view(&update.config, update.param);
                }
            })
        };
        let added = display.borrow().title().to_string();
        info!("{} fuses {added}", self.title);

        self.series.push(FusedSeries {
            display: display.clone(),
            connection,
        });
        if self.selected.is_none() {
            self.selected = Some(0);
        }
        if self.series.len() == 1 {
            self.set_selected_opacity(1.0);
        }
        true
    }

    /// Give `display` its own viewers back. Returns `false` when it was not
    /// fused here.
    pub fn remove(&mut self, display: &SharedSeriesDisplay) -> bool {
        let Some(position) = self.position(display) else {
            return false;
        };
        let fused = self.series.remove(position);
        {
            let mut series_display = fused.display.borrow_mut();
            for (merged, viewer) in self.viewers.iter().zip(series_display.viewers()) {
                merged.borrow_mut().unlink_series_viewer(viewer);
            }
            series_display.disconnect(fused.connection);
            series_display.allow_fusion(false);
        }
        info!("{} releases {}", self.title, fused.display.borrow().title());

        self.selected = (!self.series.is_empty()).then_some(0);
        if self.series.len() == 1 {
            self.set_selected_opacity(1.0);
        }
        true
    }

    pub fn remove_all(&mut self) {
        while let Some(fused) = self.series.first() {
            let display = fused.display.clone();
            self.remove(&display);
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_display(&self) -> Option<&SharedSeriesDisplay> {
        self.selected
            .and_then(|index| self.series.get(index))
            .map(|fused| &fused.display)
    }

    /// Returns `false` when `index` names no fused series.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.series.len() {
            return false;
        }
        self.selected = Some(index);
        true
    }

    /// Opacity of the selected series, `None` without one.
    pub fn selected_opacity(&self) -> Option<f64> {
        self.selected_display()
            .map(|display| display.borrow().props_opacity())
    }

    pub fn set_selected_opacity(&mut self, opacity: f64) {
        let Some(display) = self.selected_display() else {
            return;
        };
        display.borrow_mut().set_props_opacity(opacity);
        for viewer in &self.viewers {
            viewer.borrow_mut().redraw();
        }
    }

    pub fn change_current_slice(&mut self, orientation: Orientation, position: f64) {
        self.viewer(ViewerRole::Slice(orientation))
            .borrow_mut()
            .change_current_slice(position);
    }

    /// Slice span over every fused series along `orientation`.
    pub fn slice_span(&self, orientation: Orientation) -> (f64, f64) {
        let viewer = self.viewer(ViewerRole::Slice(orientation)).borrow();
        (viewer.min_slice(), viewer.max_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;
    use crate::viewer::test_util::{ct_config, ct_series};

    fn display() -> SharedSeriesDisplay {
        SeriesDisplay::new(ct_series()).shared()
    }

    #[test]
    fn update_reaches_all_four_viewers_and_listeners() {
        let display = display();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        display
            .borrow_mut()
            .connect(move |update| sink.borrow_mut().push(update.param));

        display
            .borrow_mut()
            .update_view_configuration(&ct_config(), ViewParam::Colormap);

        for viewer in display.borrow().viewers() {
            let revisions = viewer.borrow().revisions();
            assert_eq!((revisions.color, revisions.redraws), (1, 1));
        }
        assert_eq!(*received.borrow(), vec![ViewParam::Colormap]);
    }

    #[test]
    fn fusing_sets_half_opacity_and_single_series_full() {
        let first = display();
        let second = display();
        let mut merged = MergedDisplay::new("Fusion");

        assert!(merged.add(&first));
        assert!(!merged.add(&first));
        assert!(first.borrow().is_fused());
        // alone in the fusion, the series is fully opaque
        assert_eq!(first.borrow().props_opacity(), 1.0);

        assert!(merged.add(&second));
        assert_eq!(second.borrow().props_opacity(), 0.5);
        assert_eq!(merged.selected(), Some(0));

        assert!(merged.select(1));
        merged.set_selected_opacity(0.3);
        assert_eq!(second.borrow().props_opacity(), 0.3);
        assert_eq!(merged.selected_opacity(), Some(0.3));
        assert!(!merged.select(2));

        assert!(merged.remove(&first));
        assert!(!first.borrow().is_fused());
        assert_eq!(first.borrow().props_opacity(), 1.0);
        assert_eq!(merged.selected(), Some(0));
        assert_eq!(second.borrow().props_opacity(), 1.0);

        merged.remove_all();
        assert!(merged.is_empty());
        assert_eq!(merged.selected(), None);
        assert!(!second.borrow().is_fused());
    }

    #[test]
    fn series_broadcast_redraws_merged_viewers() {
        let display = display();
        let mut merged = MergedDisplay::new("Fusion");
        merged.add(&display);
        let before = merged.viewer(ViewerRole::Volume).borrow().revisions().redraws;

        let mut config = ct_config();
        config.set_hounsfield(Range::new(-100.0, 100.0), config.hounsfield_max_range());
        display
            .borrow_mut()
            .update_view_configuration(&config, ViewParam::Hounsfield);

        for role in ViewerRole::ALL {
            let revisions = merged.viewer(role).borrow().revisions();
            assert_eq!(revisions.color, 0);
        }
        assert_eq!(
            merged.viewer(ViewerRole::Volume).borrow().revisions().redraws,
            before + 1
        );

        merged.remove(&display);
        display
            .borrow_mut()
            .update_view_configuration(&config, ViewParam::Hounsfield);
        assert_eq!(
            merged.viewer(ViewerRole::Volume).borrow().revisions().redraws,
            before + 2
        );
    }

    #[test]
    fn merged_slice_moves_fused_slices() {
        let display = display();
        let mut merged = MergedDisplay::new("Fusion");
        merged.add(&display);
        assert_eq!(merged.slice_span(Orientation::Sagittal), (0.0, 3.0));

        merged.change_current_slice(Orientation::Sagittal, 2.0);

        let series_display = display.borrow();
        let viewer = series_display
            .viewer(ViewerRole::Slice(Orientation::Sagittal))
            .borrow();
        assert_eq!(viewer.as_slice().unwrap().displayed_slice(), Some(2));
    }
}
