//! A loaded series: its voxels, descriptive metadata, rescale parameters and
//! the windows derived for it.
//!
//! Windows are always stored in Hounsfield units. Raw voxel values relate to
//! them through `HU = raw * slope + intercept`; a window width is a size and
//! only scales with the slope.

use glam::DVec3;
use tracing::{debug, warn};

use crate::range::Range;
use crate::volume::Volume;

/// A window given by its centre and width, in Hounsfield units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    pub center: f64,
    pub width: f64,
}

impl WindowLevel {
    pub fn to_range(self) -> Range {
        Range::new(self.center - self.width / 2.0, self.center + self.width / 2.0)
    }
}

/// Parse the backslash separated Window Center and Window Width values.
///
/// Both lists must parse completely and hold the same number of values,
/// otherwise no window is returned.
pub fn parse_window_tags(centers: &str, widths: &str) -> Vec<WindowLevel> {
    let parse = |list: &str| -> Option<Vec<f64>> {
        list.split('\\')
            .map(|value| value.trim().parse::<f64>().ok())
            .collect()
    };
    match (parse(centers), parse(widths)) {
        (Some(centers), Some(widths)) if centers.len() == widths.len() => centers
            .into_iter()
            .zip(widths)
            .map(|(center, width)| WindowLevel { center, width })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct SeriesData {
    pub volume: Volume,
    pub patient_name: String,
    pub study_description: String,
    pub series_description: String,
    pub modality: String,
    /// Row and column direction cosines of the slices.
    pub orientation: Option<(DVec3, DVec3)>,
    rescale_intercept: f64,
    rescale_slope: f64,
    basic_windows: Vec<WindowLevel>,
}

impl Default for SeriesData {
    fn default() -> Self {
        Self::new(Volume::default())
    }
}

impl SeriesData {
    /// A series with an identity rescale (intercept 0, slope 1) and no
    /// window.
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            patient_name: String::new(),
            study_description: String::new(),
            series_description: String::new(),
            modality: "?".to_string(),
            orientation: None,
            rescale_intercept: 0.0,
            rescale_slope: 1.0,
            basic_windows: Vec::new(),
        }
    }

    /// `"[MODALITY] patient name"`
    pub fn title(&self) -> String {
        format!("[{}] {}", self.modality, self.patient_name)
    }

    pub fn rescale_intercept(&self) -> f64 {
        self.rescale_intercept
    }

    pub fn rescale_slope(&self) -> f64 {
        self.rescale_slope
    }

    /// Change the rescale parameters while keeping the raw meaning of every
    /// stored window: each window goes back to raw units with the old
    /// parameters, then forward to Hounsfield units with the new ones.
    ///
    /// A zero or non-finite slope, or a non-finite intercept, cannot be
    /// inverted; the parameters are then left unchanged and `false` is
    /// returned.
    pub fn set_rescale_intercept_and_slope(&mut self, intercept: f64, slope: f64) -> bool {
        if slope == 0.0 || !slope.is_finite() || !intercept.is_finite() {
            warn!("Ignoring rescale intercept {intercept} and slope {slope}");
            return false;
        }
        let raw: Vec<WindowLevel> = self
            .basic_windows
            .iter()
            .map(|window| WindowLevel {
                center: self.convert_from_hu(window.center, false),
                width: self.convert_from_hu(window.width, true),
            })
            .collect();

        self.rescale_intercept = intercept;
        self.rescale_slope = slope;

        self.basic_windows = raw
            .into_iter()
            .map(|window| WindowLevel {
                center: self.convert_to_hu(window.center, false),
                width: self.convert_to_hu(window.width, true),
            })
            .collect();
        true
    }

    /// Raw voxel value to Hounsfield units. A size only scales.
    pub fn convert_to_hu(&self, value: f64, is_size: bool) -> f64 {
        if is_size {
            value * self.rescale_slope
        } else {
            value * self.rescale_slope + self.rescale_intercept
        }
    }

    /// Hounsfield units to raw voxel value. A size only scales.
    pub fn convert_from_hu(&self, value: f64, is_size: bool) -> f64 {
        if is_size {
            value / self.rescale_slope
        } else {
            (value - self.rescale_intercept) / self.rescale_slope
        }
    }

    /// Convert a Hounsfield range to raw voxel values.
    pub fn range_from_hu(&self, range: Range) -> Range {
        range.map(|value| self.convert_from_hu(value, false))
    }

    /// Store the window covering the whole scalar range of the volume.
    /// Does nothing for an empty volume.
    pub fn add_scalar_range_window(&mut self) {
        let Some(scalar_range) = self.volume.scalar_range() else {
            return;
        };
        let center = self.convert_to_hu((scalar_range.max() + scalar_range.min()) / 2.0, false);
        let width = self.convert_to_hu(scalar_range.size(), true);
        debug!("Scalar range {scalar_range} gives window {center} / {width}");
        self.add_basic_window(WindowLevel { center, width });
    }

    /// Store a window already expressed in Hounsfield units.
    pub fn add_basic_window(&mut self, window: WindowLevel) {
        self.basic_windows.push(window);
    }

    pub fn basic_windows(&self) -> &[WindowLevel] {
        &self.basic_windows
    }

    pub fn compute_basic_hounsfield_ranges(&self) -> Vec<Range> {
        self.basic_windows
            .iter()
            .map(|window| window.to_range())
            .collect()
    }

    /// The window to show first: the second stored window when there is one
    /// (the first tag-provided window, since the scalar range window is
    /// always stored first), the first one otherwise.
    pub fn basic_hounsfield(&self) -> Option<Range> {
        self.basic_windows
            .get(1)
            .or_else(|| self.basic_windows.first())
            .map(|window| window.to_range())
    }
}
