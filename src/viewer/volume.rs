use std::sync::Arc;

use crate::range::Range;
use crate::series::SeriesData;
use crate::transfer_function::{ColorFunction, OpacityFunction};
use crate::view_configuration::ViewConfiguration;

use super::{Revisions, Transform, Viewer};

/// How rays through the volume are accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RayCastMode {
    #[default]
    Composite,
    MaximumIntensity,
}

/// Ray-cast view of a whole series.
///
/// Both transfer functions are expressed in raw voxel units, ready for a
/// renderer sampling the voxel buffer directly.
#[derive(Debug)]
pub struct VolumeViewer {
    series: Arc<SeriesData>,
    opacity_function: OpacityFunction,
    color_function: ColorFunction,
    transform: Transform,
    opacity: f64,
    /// Raw span of the opacity ramp: (full range, window).
    opacity_ranges: Option<(Range, Range)>,
    ray_cast_mode: RayCastMode,
    revisions: Revisions,
    pub(super) in_own_scene: bool,
}

impl VolumeViewer {
    pub fn new(series: Arc<SeriesData>) -> Self {
        Self {
            series,
            opacity_function: OpacityFunction::new(),
            color_function: ColorFunction::new(),
            transform: Transform::default(),
            opacity: 1.0,
            opacity_ranges: None,
            ray_cast_mode: RayCastMode::default(),
            revisions: Revisions::default(),
            in_own_scene: true,
        }
    }

    pub fn series(&self) -> &Arc<SeriesData> {
        &self.series
    }

    pub fn opacity_function(&self) -> &OpacityFunction {
        &self.opacity_function
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

    pub fn ray_cast_mode(&self) -> RayCastMode {
        self.ray_cast_mode
    }

    pub fn enable_mip(&mut self, enable: bool) {
        self.ray_cast_mode = if enable {
            RayCastMode::MaximumIntensity
        } else {
            RayCastMode::Composite
        };
        self.redraw();
    }

    pub fn prop_opacity(&self) -> f64 {
        self.opacity
    }

    /// Change the opacity plateau above the window. The colour function is
    /// left as is.
    pub fn set_prop_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
        if let Some((full, window)) = self.opacity_ranges {
            self.build_opacity_function(full, window);
        }
    }

    fn build_opacity_function(&mut self, full: Range, window: Range) {
        let mut func = OpacityFunction::new();
        func.add_point(full.min(), 0.0);
        func.add_point(window.min(), 0.0);
        func.add_point(window.max(), self.opacity);
        func.add_point(full.max(), self.opacity);
        self.opacity_function = func;
        self.opacity_ranges = Some((full, window));
        self.revisions.opacity += 1;
    }
}

impl Viewer for VolumeViewer {
    fn update_hounsfield(&mut self, config: &ViewConfiguration) {
        let full = self
            .series
            .compute_basic_hounsfield_ranges()
            .first()
            .copied()
            .unwrap_or_else(|| config.hounsfield_max_range());
        let full = self.series.range_from_hu(full);
        let window = self.series.range_from_hu(config.hounsfield());
        self.build_opacity_function(full, window);

        // the colour function follows the window
        self.update_colormap(config);
    }

    fn update_colormap(&mut self, config: &ViewConfiguration) {
        let on_range = self.series.range_from_hu(config.hounsfield_max_range());
        let window = self.series.range_from_hu(config.hounsfield());
        self.color_function = config.colormap().compute_color_function(on_range, window);
        self.revisions.color += 1;
    }

    fn update_translation(&mut self, config: &ViewConfiguration) {
        self.transform.position = config.translation();
        self.revisions.transform += 1;
    }

    fn update_rotation(&mut self, config: &ViewConfiguration) {
        self.transform.orientation = config.rotation();
        self.revisions.transform += 1;
    }

    fn redraw(&mut self) {
        self.revisions.redraws += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::test_util::{ct_config, ct_series};
    use crate::view_configuration::ViewParam;
    use glam::DVec3;

    fn node_xs(func: &OpacityFunction) -> Vec<f64> {
        func.nodes().iter().map(|node| node.x).collect()
    }

    fn node_values(func: &OpacityFunction) -> Vec<f64> {
        func.nodes().iter().map(|node| node.value).collect()
    }

    #[test]
    fn opacity_ramp_is_in_raw_units() {
        let mut viewer = VolumeViewer::new(ct_series());
        viewer.update_view(&ct_config(), ViewParam::Hounsfield);

        // full range is the scalar range window, raw 0..2048
        assert_eq!(
            node_xs(viewer.opacity_function()),
            vec![0.0, 864.0, 1264.0, 2048.0]
        );
        assert_eq!(node_values(viewer.opacity_function()), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn prop_opacity_only_moves_plateau() {
        let mut viewer = VolumeViewer::new(ct_series());
        viewer.update_view(&ct_config(), ViewParam::All);
        let colors = viewer.revisions().color;
        let color_function = viewer.color_function().clone();

        viewer.set_prop_opacity(0.5);

        assert_eq!(node_values(viewer.opacity_function()), vec![0.0, 0.0, 0.5, 0.5]);
        assert_eq!(
            node_xs(viewer.opacity_function()),
            vec![0.0, 864.0, 1264.0, 2048.0]
        );
        assert_eq!(viewer.revisions().color, colors);
        assert_eq!(viewer.color_function(), &color_function);
    }

    #[test]
    fn opacity_before_first_update_is_kept() {
        let mut viewer = VolumeViewer::new(ct_series());
        viewer.set_prop_opacity(0.25);
        assert!(viewer.opacity_function().is_empty());

        viewer.update_view(&ct_config(), ViewParam::Hounsfield);
        assert_eq!(node_values(viewer.opacity_function()), vec![0.0, 0.0, 0.25, 0.25]);
    }

    #[test]
    fn colour_function_spans_raw_max_range() {
        let mut viewer = VolumeViewer::new(ct_series());
        viewer.update_view(&ct_config(), ViewParam::Colormap);

        let range = viewer.color_function().range().unwrap();
        assert!((range.min() - 0.0).abs() < 1e-5);
        assert!((range.max() - 2048.0).abs() < 1e-5);
    }

    #[test]
    fn transform_follows_translation_and_rotation() {
        let mut viewer = VolumeViewer::new(ct_series());
        let mut config = ct_config();
        config.set_translation(DVec3::new(1.0, 2.0, 3.0));
        config.set_rotation(DVec3::new(90.0, 0.0, 45.0));

        viewer.update_view(&config, ViewParam::Translation);
        assert_eq!(viewer.transform().position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(viewer.transform().orientation, DVec3::ZERO);

        viewer.update_view(&config, ViewParam::Rotation);
        assert_eq!(viewer.transform().orientation, DVec3::new(90.0, 0.0, 45.0));
    }

    #[test]
    fn mip_toggle_redraws() {
        let mut viewer = VolumeViewer::new(ct_series());
        viewer.enable_mip(true);
        assert_eq!(viewer.ray_cast_mode(), RayCastMode::MaximumIntensity);
        viewer.enable_mip(false);
        assert_eq!(viewer.ray_cast_mode(), RayCastMode::Composite);
        assert_eq!(viewer.revisions().redraws, 2);
    }
}
