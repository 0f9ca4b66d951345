use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use dicom_viewer::color::Rgb;
use dicom_viewer::colormap::Colormap;
use dicom_viewer::display::{MergedDisplay, SeriesDisplay, SharedSeriesDisplay};
use dicom_viewer::editor::{EditorKind, ViewConfigurationEditor};
use dicom_viewer::enums::Orientation;
use dicom_viewer::range::Range;
use dicom_viewer::series::{SeriesData, WindowLevel};
use dicom_viewer::view_configuration::{ViewConfiguration, ViewParam};
use dicom_viewer::viewer::ViewerRole;
use dicom_viewer::volume::Volume;
use glam::DVec3;
use ndarray::Array3;
use rstest::rstest;

/// 8 x 8 x 4 voxels of a CT-like series, raw values 0..=2000.
fn series(intercept: f64) -> Arc<SeriesData> {
    let data = Array3::from_shape_fn((4, 8, 8), |(z, y, x)| {
        ((x + 8 * y + 64 * z) * 2000 / 255) as f32
    });
    let mut series = SeriesData::new(Volume::new(data, (0.5, 0.5, 2.0)));
    series.set_rescale_intercept_and_slope(intercept, 1.0);
    series.add_scalar_range_window();
    series.add_basic_window(WindowLevel {
        center: 40.0,
        width: 400.0,
    });
    Arc::new(series)
}

fn grayscale() -> Colormap {
    let mut colormap = Colormap::new();
    colormap.add_color(0.0, Rgb::BLACK);
    colormap.add_color(1.0, Rgb::WHITE);
    colormap
}

fn initial_config() -> ViewConfiguration {
    let mut config = ViewConfiguration::new();
    config.set_hounsfield(Range::new(-160.0, 240.0), Range::new(-1000.0, 1000.0));
    config.set_colormap(grayscale());
    config
}

/// An editor wired to `display` and already broadcast once.
fn editor_for(display: &SharedSeriesDisplay, kind: EditorKind) -> ViewConfigurationEditor {
    let mut editor = ViewConfigurationEditor::new(kind, initial_config());
    let display = display.clone();
    editor.connect(move |update| {
        display
            .borrow_mut()
            .update_view_configuration(&update.config, update.param)
    });
    editor.reset();
    editor
}

fn assert_gray(color: Rgb, level: f64) {
    for channel in [color.r, color.g, color.b] {
        assert!((channel - level).abs() < 1e-6, "{color:?} is not gray {level}");
    }
}

#[test]
fn range_maps_values_to_fractions() {
    let range = Range::new(0.0, 100.0);
    assert_eq!(range.relative(25.0, true), 0.25);
    assert_eq!(range.absolute(0.25, true), 25.0);
    assert_eq!(range.relative(150.0, true), 1.0);
}

#[test]
fn linear_grayscale_is_mid_gray_at_window_center() {
    let function = grayscale().compute_color_function(
        Range::new(-1000.0, 1000.0),
        Range::new(-500.0, 500.0),
    );

    assert_gray(function.value_at(0.0).unwrap(), 0.5);
    assert_gray(function.value_at(-800.0).unwrap(), 0.0);
    assert_gray(function.value_at(800.0).unwrap(), 1.0);
}

#[test]
fn straight_lut_collapses_to_its_ends() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0, 128, 255, 0, 128, 255, 0, 128, 255]).unwrap();

    let mut colormap = Colormap::new();
    colormap.load_from_lut_file(file.path()).unwrap();

    assert_eq!(colormap.count(), 2);
    assert_eq!(colormap.start_at(0), Some(0.0));
    assert_eq!(colormap.start_at(1), Some(1.0));
    assert_eq!(colormap.color_at(1), Some(Rgb::WHITE));
}

#[rstest]
#[case(Orientation::Axial)]
#[case(Orientation::Coronal)]
#[case(Orientation::Sagittal)]
fn window_edit_reaches_every_slice_viewer(#[case] orientation: Orientation) {
    let display = SeriesDisplay::new(series(-1024.0)).shared();
    let mut editor = editor_for(&display, EditorKind::HounsfieldColormap);

    let viewer = display.borrow().viewer(ViewerRole::Slice(orientation)).clone();
    let before = viewer.borrow().as_slice().unwrap().color_function().clone();

    editor.edit(|config| config.set_hounsfield(Range::new(0.0, 80.0), Range::new(-1000.0, 1000.0)));

    let viewer = viewer.borrow();
    let slice = viewer.as_slice().unwrap();
    assert_ne!(slice.color_function(), &before);
    // raw 1064 is 40 HU, the middle of the new window
    assert_gray(slice.color_function().value_at(1064.0).unwrap(), 0.5);
}

#[test]
fn translation_edit_leaves_colour_untouched() {
    let display = SeriesDisplay::new(series(-1024.0)).shared();
    let _window = editor_for(&display, EditorKind::HounsfieldColormap);
    let mut transform = editor_for(&display, EditorKind::TranslationRotation);

    let viewers = display.borrow().viewers().clone();
    let before: Vec<_> = viewers.iter().map(|viewer| viewer.borrow().revisions()).collect();

    transform.edit(|config| config.set_translation(DVec3::new(0.0, 0.0, 10.0)));

    for (viewer, before) in viewers.iter().zip(before) {
        let after = viewer.borrow().revisions();
        assert_eq!(after.color, before.color);
        assert_eq!(after.opacity, before.opacity);
        assert!(after.transform > before.transform);
    }
    let axial = viewers[ViewerRole::Slice(Orientation::Axial).index()].borrow();
    assert_eq!(axial.as_slice().unwrap().slice_offset(), 10.0);
}

#[test]
fn edits_without_real_time_apply_on_accept() {
    let display = SeriesDisplay::new(series(-1024.0)).shared();
    let mut editor = editor_for(&display, EditorKind::HounsfieldColormap);
    let volume = display.borrow().viewer(ViewerRole::Volume).clone();
    let applied = volume.borrow().revisions();

    editor.set_real_time(false);
    editor.edit(|config| config.set_hounsfield(Range::new(0.0, 80.0), Range::new(-1000.0, 1000.0)));
    assert_eq!(volume.borrow().revisions(), applied);

    editor.accept();
    assert!(volume.borrow().revisions().color > applied.color);
    assert_eq!(editor.committed().hounsfield(), Range::new(0.0, 80.0));
}

#[test]
fn fused_series_share_merged_viewers() {
    let first = SeriesDisplay::new(series(-1024.0)).shared();
    let second = SeriesDisplay::new(series(0.0)).shared();
    let mut editor = editor_for(&first, EditorKind::HounsfieldColormap);

    let mut merged = MergedDisplay::new("fusion");
    assert!(merged.add(&first));
    assert!(merged.add(&second));
    assert!(!merged.add(&first));

    assert!(first.borrow().is_fused());
    assert!(second.borrow().is_fused());
    // the first series was shown alone when fused and keeps full opacity
    assert_eq!(first.borrow().props_opacity(), 1.0);
    assert_eq!(second.borrow().props_opacity(), 0.5);

    let merged_volume = merged.viewer(ViewerRole::Volume).clone();
    let redraws = merged_volume.borrow().revisions().redraws;
    editor.edit(|config| config.set_hounsfield(Range::new(0.0, 80.0), Range::new(-1000.0, 1000.0)));
    // one redraw per useful parameter
    assert_eq!(merged_volume.borrow().revisions().redraws, redraws + 2);

    assert!(merged.remove(&second));
    assert!(!second.borrow().is_fused());
    assert_eq!(first.borrow().props_opacity(), 1.0);
    assert_eq!(merged_volume.borrow().linked().len(), 1);
}

#[test]
fn merged_slices_follow_current_position() {
    let first = SeriesDisplay::new(series(-1024.0)).shared();
    let mut merged = MergedDisplay::new("fusion");
    merged.add(&first);

    let (min, max) = merged.slice_span(Orientation::Axial);
    assert_eq!((min, max), (0.0, 6.0));

    merged.change_current_slice(Orientation::Axial, 4.0);
    let viewer = first.borrow().viewer(ViewerRole::Slice(Orientation::Axial)).clone();
    assert_eq!(viewer.borrow().as_slice().unwrap().displayed_slice(), Some(2));

    let shown = Rc::new(RefCell::new(None));
    let sink = shown.clone();
    first
        .borrow_mut()
        .connect(move |update| *sink.borrow_mut() = Some(update.param));
    first
        .borrow_mut()
        .update_view_configuration(&initial_config(), ViewParam::All);
    assert_eq!(*shown.borrow(), Some(ViewParam::All));
}
