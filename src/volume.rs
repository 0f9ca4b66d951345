use crate::color::Rgb;
use crate::enums::Orientation;
use crate::range::Range;
use crate::transfer_function::ColorFunction;

use image::ImageBuffer;
use image::Rgb as Pixel;
use image::RgbImage;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::parallel::prelude::*;
use ndarray::s;

/// Raw voxel values of a series, stored as (depth, height, width).
#[derive(Debug, Clone, Default)]
pub struct Volume {
    pub data: Array3<f32>,
    /// Voxel size along (x, y, z)
    pub spacing: (f64, f64, f64),
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: (f64, f64, f64)) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// Minimum and maximum raw voxel value, `None` for an empty volume.
    pub fn scalar_range(&self) -> Option<Range> {
        if self.data.is_empty() {
            return None;
        }
        let (min, max) = self
            .data
            .par_iter()
            .fold(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(min, max), &v| (min.min(v), max.max(v)),
            )
            .reduce(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(a_min, a_max), (b_min, b_max)| (a_min.min(b_min), a_max.max(b_max)),
            );
        Some(Range::new(min as f64, max as f64))
    }

    /// Number of slices along the normal of `orientation`.
    pub fn slice_count(&self, orientation: Orientation) -> usize {
        let (depth, height, width) = self.dim();
        match orientation {
            Orientation::Axial => depth,
            Orientation::Coronal => height,
            Orientation::Sagittal => width,
        }
    }

    /// Physical extent of the volume along the normal of `orientation`, the
    /// first voxel centre being at the origin.
    pub fn bounds(&self, orientation: Orientation) -> Range {
        let spacing = match orientation {
            Orientation::Sagittal => self.spacing.0,
            Orientation::Coronal => self.spacing.1,
            Orientation::Axial => self.spacing.2,
        };
        let last = self.slice_count(orientation).saturating_sub(1) as f64;
        Range::new(0.0, last * spacing)
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice_result = match orientation {
            Orientation::Axial => self.data().slice(s![index, .., ..]),
            Orientation::Coronal => self.data().slice(s![.., index, ..]),
            Orientation::Sagittal => self.data().slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    /// Colour one slice by evaluating `color_function` on its raw values.
    pub fn render_slice(
        &self,
        index: usize,
        orientation: Orientation,
        color_function: &ColorFunction,
    ) -> Option<RgbImage> {
        let slice = self.get_slice_from_axis(index, &orientation)?;
        Self::slice_to_image(&slice, color_function)
    }

    fn slice_to_image(
        slice: &ArrayView2<'_, f32>,
        color_function: &ColorFunction,
    ) -> Option<RgbImage> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .flat_map_iter(|&v| {
                color_function
                    .value_at(v as f64)
                    .unwrap_or(Rgb::BLACK)
                    .to_u8()
            })
            .collect();
        ImageBuffer::<Pixel<u8>, _>::from_raw(width as u32, height as u32, pixel_data)
    }

    fn is_valid_index(&self, index: usize, orientation: &Orientation) -> bool {
        index < self.slice_count(*orientation)
    }
}
