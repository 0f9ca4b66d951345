use std::sync::Arc;

use glam::DVec3;
use image::RgbImage;
use tracing::trace;

use crate::enums::Orientation;
use crate::range::Range;
use crate::series::SeriesData;
use crate::transfer_function::ColorFunction;
use crate::view_configuration::ViewConfiguration;

use super::{Revisions, Transform, Viewer};

/// One orthogonal slice through a series.
///
/// The shown slice is chosen by a physical position along the slice normal.
/// A translation along the normal shifts the series, so the position is
/// compared against the slice range after removing that offset.
#[derive(Debug)]
pub struct SliceViewer {
    series: Arc<SeriesData>,
    orientation: Orientation,
    color_function: ColorFunction,
    transform: Transform,
    opacity: f64,
    slice_range: Range,
    slice_index_range: Range,
    slice_offset: f64,
    current_slice: f64,
    displayed_slice: Option<usize>,
    revisions: Revisions,
    pub(super) in_own_scene: bool,
}

impl SliceViewer {
    pub fn new(series: Arc<SeriesData>, orientation: Orientation) -> Self {
        let volume = &series.volume;
        let slice_range = volume.bounds(orientation);
        let count = volume.slice_count(orientation);
        let slice_index_range = Range::new(0.0, count.saturating_sub(1) as f64);
        let displayed_slice = (count > 0).then_some(0);
        Self {
            series,
            orientation,
            color_function: ColorFunction::new(),
            transform: Transform::default(),
            opacity: 1.0,
            slice_range,
            slice_index_range,
            slice_offset: 0.0,
            current_slice: 0.0,
            displayed_slice,
            revisions: Revisions::default(),
            in_own_scene: true,
        }
    }

    pub fn series(&self) -> &Arc<SeriesData> {
        &self.series
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn color_function(&self) -> &ColorFunction {
        &self.color_function
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub fn prop_opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_prop_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }

    /// Physical extent of the series along the slice normal.
    pub fn slice_range(&self) -> Range {
        self.slice_range
    }

    pub fn slice_offset(&self) -> f64 {
        self.slice_offset
    }

    pub fn current_slice(&self) -> f64 {
        self.current_slice
    }

    /// Index of the shown slice, `None` while the requested position falls
    /// outside the series.
    pub fn displayed_slice(&self) -> Option<usize> {
        self.displayed_slice
    }

    pub fn is_visible(&self) -> bool {
        self.displayed_slice.is_some()
    }

    pub fn change_current_slice(&mut self, position: f64) {
        self.apply_slice(position);
        self.redraw();
    }

    fn apply_slice(&mut self, position: f64) {
        self.current_slice = position;
        let value = position - self.slice_offset;

        self.displayed_slice = if value < self.slice_range.min() || value > self.slice_range.max() {
            None
        } else {
            let index = self
                .slice_index_range
                .absolute(self.slice_range.relative(value, true), true);
            Some((0.5 + index).floor() as usize)
        };
        trace!(
            "{} slice at {position} shows {:?}",
            self.orientation.name(),
            self.displayed_slice
        );
    }

    /// Colour the shown slice through the current colour function.
    pub fn render(&self) -> Option<RgbImage> {
        let index = self.displayed_slice?;
        self.series
            .volume
            .render_slice(index, self.orientation, &self.color_function)
    }
}

impl Viewer for SliceViewer {
    fn update_hounsfield(&mut self, config: &ViewConfiguration) {
        // the window is applied through the colour function
        self.update_colormap(config);
    }

    fn update_colormap(&mut self, config: &ViewConfiguration) {
        let on_range = self.series.range_from_hu(config.hounsfield_max_range());
        let window = self.series.range_from_hu(config.hounsfield());
        self.color_function = config.colormap().compute_color_function(on_range, window);
        self.revisions.color += 1;
    }

    fn update_translation(&mut self, config: &ViewConfiguration) {
        let axis = self.orientation.normal_axis();
        let translation = config.translation();

        let mut position = translation;
        position[axis] = self.transform.position[axis];
        self.transform.position = position;
        self.slice_offset = translation[axis];
        self.revisions.transform += 1;

        self.apply_slice(self.current_slice);
    }

    fn update_rotation(&mut self, config: &ViewConfiguration) {
        let axis = self.orientation.normal_axis();
        let mut orientation = DVec3::ZERO;
        orientation[axis] = config.rotation()[axis];
        self.transform.orientation = orientation;
        self.revisions.transform += 1;
    }

    fn redraw(&mut self) {
        self.revisions.redraws += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_configuration::ViewParam;
    use crate::viewer::test_util::{ct_config, ct_series};
    use crate::volume::Volume;
    use ndarray::Array3;
    use rstest::rstest;

    #[rstest]
    #[case(Orientation::Sagittal, Range::new(0.0, 3.0))]
    #[case(Orientation::Coronal, Range::new(0.0, 2.0))]
    #[case(Orientation::Axial, Range::new(0.0, 2.0))]
    fn slice_range_follows_volume_bounds(#[case] orientation: Orientation, #[case] expected: Range) {
        let viewer = SliceViewer::new(ct_series(), orientation);
        assert_eq!(viewer.slice_range(), expected);
        assert_eq!(viewer.displayed_slice(), Some(0));
    }

    #[rstest]
    #[case(0.0, Some(0))]
    #[case(1.4, Some(1))]
    #[case(1.5, Some(2))]
    #[case(3.0, Some(3))]
    #[case(3.1, None)]
    #[case(-0.1, None)]
    fn position_picks_nearest_slice(#[case] position: f64, #[case] expected: Option<usize>) {
        let mut viewer = SliceViewer::new(ct_series(), Orientation::Sagittal);
        viewer.change_current_slice(position);
        assert_eq!(viewer.displayed_slice(), expected);
        assert_eq!(viewer.is_visible(), expected.is_some());
    }

    #[test]
    fn translation_along_normal_becomes_slice_offset() {
        let mut viewer = SliceViewer::new(ct_series(), Orientation::Sagittal);
        viewer.change_current_slice(3.0);
        assert_eq!(viewer.displayed_slice(), Some(3));

        let mut config = ct_config();
        config.set_translation(DVec3::new(2.0, 5.0, -1.0));
        viewer.update_view(&config, ViewParam::Translation);

        assert_eq!(viewer.slice_offset(), 2.0);
        assert_eq!(viewer.transform().position, DVec3::new(0.0, 5.0, -1.0));
        // same position, now two slices lower in the series
        assert_eq!(viewer.current_slice(), 3.0);
        assert_eq!(viewer.displayed_slice(), Some(1));
        assert_eq!(viewer.revisions().redraws, 2);
    }

    #[test]
    fn rotation_keeps_only_normal_component() {
        let mut viewer = SliceViewer::new(ct_series(), Orientation::Coronal);
        let mut config = ct_config();
        config.set_rotation(DVec3::new(10.0, 20.0, 30.0));
        viewer.update_view(&config, ViewParam::Rotation);
        assert_eq!(viewer.transform().orientation, DVec3::new(0.0, 20.0, 0.0));
    }

    #[test]
    fn hounsfield_recomputes_colours_only() {
        let mut viewer = SliceViewer::new(ct_series(), Orientation::Axial);
        viewer.update_view(&ct_config(), ViewParam::Hounsfield);
        assert_eq!(
            viewer.revisions(),
            Revisions { opacity: 0, color: 1, transform: 0, redraws: 1 }
        );
    }

    #[test]
    fn render_uses_colour_function() {
        let mut viewer = SliceViewer::new(ct_series(), Orientation::Axial);
        assert_eq!(
            viewer.render().map(|image| image.dimensions()),
            Some((4, 3))
        );

        viewer.update_view(&ct_config(), ViewParam::All);
        let image = viewer.render().unwrap();
        // raw 0 is below the window, the first colour is black
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);

        viewer.change_current_slice(10.0);
        assert!(viewer.render().is_none());
    }

    #[test]
    fn nan_voxel_renders_as_first_colour() {
        let data = Array3::from_shape_vec((1, 1, 3), vec![0.0, f32::NAN, 100.0]).unwrap();
        let mut series = SeriesData::new(Volume::new(data, (1.0, 1.0, 1.0)));
        series.add_scalar_range_window();
        let mut viewer = SliceViewer::new(Arc::new(series), Orientation::Axial);

        let mut config = ViewConfiguration::new();
        config.set_hounsfield(Range::new(0.0, 100.0), Range::new(0.0, 100.0));
        viewer.update_view(&config, ViewParam::All);

        let image = viewer.render().unwrap();
        assert_eq!(image.dimensions(), (3, 1));
        assert_eq!(image.get_pixel(1, 0).0, image.get_pixel(0, 0).0);
        assert_eq!(image.get_pixel(2, 0).0, [255, 255, 255]);
    }
}
