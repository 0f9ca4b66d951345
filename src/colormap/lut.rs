//! Import of binary lookup table files.
//!
//! A LUT file has no header: its `3 * n` bytes hold `n` red values, then
//! `n` green values, then `n` blue values. Loading keeps only the entries
//! that a straight line between their neighbours does not already predict.

use std::{fs, path::Path};

use thiserror::Error;
use tracing::{debug, warn};

use super::Colormap;
use crate::color::Rgb;

/// Maximum distance, in normalized RGB, between an entry and the line through
/// its neighbours for the entry to be dropped.
const ELISION_TOLERANCE: f64 = 2.0 / 255.0;

#[derive(Debug, Error)]
pub enum ColormapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LUT holds {len} bytes, at least 2 colour entries (6 bytes) are required")]
    TooShort { len: usize },
}

impl Colormap {
    /// Replace the colormap with the content of a LUT file.
    ///
    /// The colormap is cleared first and stays empty when the file cannot be
    /// read or holds fewer than two colour entries.
    pub fn load_from_lut_file(&mut self, path: impl AsRef<Path>) -> Result<(), ColormapError> {
        self.clear();
        let path = path.as_ref();
        let bytes = fs::read(path).inspect_err(|e| {
            warn!("Could not read LUT file {}: {e}", path.display());
        })?;
        self.load_from_lut_bytes(&bytes)?;
        debug!(
            "Loaded LUT {} as {} control points",
            path.display(),
            self.count()
        );
        Ok(())
    }

    /// Same as [`Colormap::load_from_lut_file`] on an in-memory buffer.
    pub fn load_from_lut_bytes(&mut self, bytes: &[u8]) -> Result<(), ColormapError> {
        self.clear();
        let entries = bytes.len() / 3;
        if entries < 2 {
            return Err(ColormapError::TooShort { len: bytes.len() });
        }

        let (reds, rest) = bytes.split_at(entries);
        let (greens, blues) = rest.split_at(entries);
        let colors: Vec<(usize, Rgb)> = (0..entries)
            .map(|i| (i, Rgb::from_u8(reds[i], greens[i], blues[i])))
            .collect();

        let last = (entries - 1) as f64;
        for (index, color) in elide_redundant(colors) {
            self.push_sorted(index as f64 / last, color);
        }
        Ok(())
    }
}

/// Drop every middle entry of a `(left, middle, right)` triple that lies
/// within [`ELISION_TOLERANCE`] of the linear interpolation between its
/// neighbours. After each drop the scan restarts from the first entry.
fn elide_redundant(mut colors: Vec<(usize, Rgb)>) -> Vec<(usize, Rgb)> {
    let mut left = 0;
    while left + 2 < colors.len() {
        let (s_left, c_left) = colors[left];
        let (s_mid, c_mid) = colors[left + 1];
        let (s_right, c_right) = colors[left + 2];

        let pos = (s_mid - s_left) as f64 / (s_right - s_left) as f64;
        let approx = c_left.lerp(c_right, pos);
        if approx.distance(c_mid) <= ELISION_TOLERANCE {
            colors.remove(left + 1);
            left = 0;
        } else {
            left += 1;
        }
    }
    colors
}
