use tracing::debug;

use crate::config::ProgramConfiguration;
use crate::range::Range;
use crate::view_configuration::ViewConfiguration;

/// Smallest window width the control lets through.
const MIN_WIDTH: f64 = 1.0;

/// A selectable window.
#[derive(Debug, Clone, PartialEq)]
pub struct HounsfieldPreset {
    pub label: String,
    pub range: Range,
}

/// Window editing rules.
///
/// The window always lies within the maximum range, the union of the
/// windows of the series and of the configured presets, and is at least
/// one unit wide. Preset index `0` is the custom window; index `i` selects
/// `presets()[i - 1]`.
#[derive(Debug, Clone)]
pub struct HounsfieldControl {
    hounsfield: Range,
    maximum: Range,
    presets: Vec<HounsfieldPreset>,
    preset: usize,
    keep_width: bool,
}

impl HounsfieldControl {
    pub fn new(series_ranges: &[Range], initial: Range, config: &ProgramConfiguration) -> Self {
        let mut presets: Vec<HounsfieldPreset> = series_ranges
            .iter()
            .map(|&range| HounsfieldPreset {
                label: format!("DICOM : {range}"),
                range,
            })
            .collect();
        let preset = series_ranges
            .iter()
            .rposition(|&range| range == initial)
            .map_or(0, |index| index + 1);

        presets.extend(
            config
                .hounsfield_presets
                .iter()
                .map(|(name, &range)| HounsfieldPreset {
                    label: format!("{name} : {range}"),
                    range,
                }),
        );

        let maximum = presets
            .iter()
            .map(|preset| preset.range)
            .reduce(|a, b| a.union(b))
            .unwrap_or(initial);
        debug!("Hounsfield maximum range {maximum}, {} presets", presets.len());

        Self {
            hounsfield: initial,
            maximum,
            presets,
            preset,
            keep_width: true,
        }
    }

    pub fn hounsfield(&self) -> Range {
        self.hounsfield
    }

    pub fn maximum_range(&self) -> Range {
        self.maximum
    }

    pub fn presets(&self) -> &[HounsfieldPreset] {
        &self.presets
    }

    pub fn preset_index(&self) -> usize {
        self.preset
    }

    pub fn keep_width(&self) -> bool {
        self.keep_width
    }

    pub fn set_keep_width(&mut self, keep_width: bool) {
        self.keep_width = keep_width;
    }

    /// Move the lower end. The upper end follows to keep the width when
    /// asked, and is pushed up to stay one unit above.
    pub fn set_min(&mut self, value: f64) {
        let width = self.hounsfield.size();
        let min = self.maximum.bound(value);
        let mut max = if self.keep_width {
            min + width
        } else {
            self.hounsfield.max()
        };
        if max < min + MIN_WIDTH {
            max = min + MIN_WIDTH;
        }
        let max = self.maximum.bound(max);
        self.hounsfield = Range::new(min.min(max - MIN_WIDTH), max);
        self.preset = 0;
    }

    /// Move the upper end. The lower end follows to keep the width when
    /// asked, and is pushed down to stay one unit below.
    pub fn set_max(&mut self, value: f64) {
        let width = self.hounsfield.size();
        let max = self.maximum.bound(value);
        let mut min = if self.keep_width {
            max - width
        } else {
            self.hounsfield.min()
        };
        if min > max - MIN_WIDTH {
            min = max - MIN_WIDTH;
        }
        let min = self.maximum.bound(min);
        self.hounsfield = Range::new(min, max.max(min + MIN_WIDTH));
        self.preset = 0;
    }

    /// Select preset `index`, `0` keeping the current window as custom.
    /// Returns `false` for an unknown index.
    pub fn load_preset(&mut self, index: usize) -> bool {
        if index == 0 {
            self.preset = 0;
            return true;
        }
        let Some(preset) = self.presets.get(index - 1) else {
            return false;
        };
        self.hounsfield = preset.range;
        self.preset = index;
        true
    }

    /// Show `hounsfield` as is, selecting the last preset equal to it.
    pub fn set_hounsfield(&mut self, hounsfield: Range) {
        self.hounsfield = hounsfield;
        self.preset = self
            .presets
            .iter()
            .rposition(|preset| preset.range == hounsfield)
            .map_or(0, |index| index + 1);
    }

    pub fn apply(&self, config: &mut ViewConfiguration) {
        config.set_hounsfield(self.hounsfield, self.maximum);
    }
}
