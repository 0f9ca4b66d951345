use crate::enums::SortBy;
use crate::series::{SeriesData, parse_window_tags};
use crate::volume::Volume;

use dicom::{
    core::Tag,
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use glam::DVec3;
use ndarray::{Array2, Array3, s};
use std::{fs, ops::ControlFlow, path::Path};
use thiserror::Error;
use tracing::{debug, info, warn};
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Loading was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

struct Steps<P> {
    done: usize,
    total: usize,
    report: P,
}

impl<P: FnMut(f64) -> ControlFlow<()>> Steps<P> {
    fn new(total: usize, report: P) -> Self {
        Self {
            done: 0,
            total: total.max(1),
            report,
        }
    }

    fn advance(&mut self) -> Result<(), VolumeLoaderError> {
        self.done += 1;
        match (self.report)(self.done as f64 / self.total as f64) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(VolumeLoaderError::Cancelled),
        }
    }
}

type Slice = (Option<f32>, Array2<f32>);

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a series from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects of the same series
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent
    /// or the pixel spacing is missing
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<SeriesData, VolumeLoaderError> {
        let mut steps = Steps::new(dicom_objects.len(), |_| ControlFlow::Continue(()));
        Self::build_series(dicom_objects, sort_by, &mut steps)
    }

    /// Load a series from file paths. `progress` receives the loaded
    /// fraction after each file read and each image decoded, and stops the
    /// load by breaking.
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
        progress: impl FnMut(f64) -> ControlFlow<()>,
    ) -> Result<SeriesData, VolumeLoaderError> {
        let start = Instant::now();
        let mut steps = Steps::new(2 * paths.len(), progress);

        let mut objects = Vec::with_capacity(paths.len());
        for path in paths {
            objects.push(open_file(path.as_ref())?);
            steps.advance()?;
        }

        let series = Self::build_series(&objects, sort_by, &mut steps)?;
        info!(
            "Loaded {} files as {:?} in {:?}",
            paths.len(),
            series.volume.dim(),
            start.elapsed()
        );
        Ok(series)
    }

    /// Load a series from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
        progress: impl FnMut(f64) -> ControlFlow<()>,
    ) -> Result<SeriesData, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        debug!("Found {} DICOM files in {}", paths.len(), path.as_ref().display());

        Self::load_from_file_paths(&paths, sort_by, progress)
    }

    fn build_series<P: FnMut(f64) -> ControlFlow<()>>(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
        steps: &mut Steps<P>,
    ) -> Result<SeriesData, VolumeLoaderError> {
        let mut images_with_order = Vec::with_capacity(dicom_objects.len());
        for dicom_object in dicom_objects {
            match Self::extract_image_with_order(dicom_object, &sort_by) {
                Some(image) => images_with_order.push(image),
                None => warn!("Skipping DICOM object without decodable image"),
            }
            steps.advance()?;
        }

        if images_with_order.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let spacing = Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        debug!("Voxel spacing {spacing:?}");

        let mut series = SeriesData::new(Volume::new(volume_array, spacing));
        Self::read_metadata(&dicom_objects[0], &mut series);
        Ok(series)
    }

    /// Fill in the descriptive tags, rescale and windows from the first
    /// instance. The scalar range window is always stored first.
    pub fn read_metadata(dicom_object: &InMemDicomObject, series: &mut SeriesData) {
        series.patient_name = Self::string_tag(dicom_object, tags::PATIENT_NAME).unwrap_or_default();
        series.study_description =
            Self::string_tag(dicom_object, tags::STUDY_DESCRIPTION).unwrap_or_default();
        series.series_description =
            Self::string_tag(dicom_object, tags::SERIES_DESCRIPTION).unwrap_or_default();
        if let Some(modality) = Self::string_tag(dicom_object, tags::MODALITY) {
            series.modality = modality;
        }
        series.orientation = Self::get_orientation(dicom_object);

        // a zero slope maps every voxel to the intercept and is skipped like
        // an unreadable tag
        let intercept = Self::float_tag(dicom_object, tags::RESCALE_INTERCEPT);
        let slope =
            Self::float_tag(dicom_object, tags::RESCALE_SLOPE).filter(|&slope| slope != 0.0);
        if let (Some(intercept), Some(slope)) = (intercept, slope) {
            series.set_rescale_intercept_and_slope(intercept, slope);
        }

        series.add_scalar_range_window();
        let centers = Self::string_tag(dicom_object, tags::WINDOW_CENTER);
        let widths = Self::string_tag(dicom_object, tags::WINDOW_WIDTH);
        if let (Some(centers), Some(widths)) = (centers, widths) {
            for window in parse_window_tags(&centers, &widths) {
                series.add_basic_window(window);
            }
        }
    }

    fn string_tag(dicom_object: &InMemDicomObject, tag: Tag) -> Option<String> {
        let value = dicom_object.element(tag).ok()?.to_str().ok()?;
        Some(value.trim().to_string())
    }

    fn float_tag(dicom_object: &InMemDicomObject, tag: Tag) -> Option<f64> {
        dicom_object.element(tag).ok()?.to_float64().ok()
    }

    fn get_orientation(dicom_object: &InMemDicomObject) -> Option<(DVec3, DVec3)> {
        let cosines = dicom_object
            .element(tags::IMAGE_ORIENTATION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match cosines.as_slice() {
            [rx, ry, rz, cx, cy, cz, ..] => {
                Some((DVec3::new(*rx, *ry, *rz), DVec3::new(*cx, *cy, *cz)))
            }
            _ => None,
        }
    }

    fn get_position(dicom_object: &InMemDicomObject) -> Option<DVec3> {
        let position = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match position.as_slice() {
            [x, y, z, ..] => Some(DVec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Slice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    /// Stored pixel values of the first frame, without any LUT applied.
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [Slice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<f32>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    /// Voxel size along (x, y, z). Pixel Spacing holds the row spacing
    /// (y) first.
    fn get_spacing(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
    ) -> Option<(f64, f64, f64)> {
        let (row_spacing, column_spacing) = dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;
            match pixel_spacing.as_slice() {
                [row, column, ..] => Some((*row, *column)),
                _ => None,
            }
        })?;

        let slice_spacing = Self::compute_slice_spacing(dicom_objects).or_else(|| {
            dicom_objects
                .iter()
                .find_map(|dicom_object| Self::float_tag(dicom_object, tags::SLICE_THICKNESS))
        })?;

        Some((column_spacing, row_spacing, slice_spacing))
    }

    fn compute_slice_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<f64> {
        let first = dicom_objects.first()?;
        let (row, column) = Self::get_orientation(first)?;
        let positions: Vec<DVec3> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::get_position(dicom_object))
            .collect();
        slice_spacing(row.cross(column), &positions)
    }
}

/// Smallest non-zero distance along `normal` between the first position
/// and any other one.
pub fn slice_spacing(normal: DVec3, positions: &[DVec3]) -> Option<f64> {
    let normal = normal.try_normalize()?;
    let (first, others) = positions.split_first()?;
    others
        .iter()
        .map(|position| normal.dot(*first - *position).abs())
        .filter(|distance| *distance > f64::EPSILON)
        .reduce(f64::min)
}
