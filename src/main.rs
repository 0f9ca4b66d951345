//! Render the three central slices of a DICOM series through a windowed
//! colormap, the way the viewer would show them.
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use dicom_viewer::{
    colormap::{InterpolationMode, ObservedColormap},
    config::ProgramConfiguration,
    display::SeriesDisplay,
    editor::{EditorKind, HounsfieldControl, ViewConfigurationEditor},
    enums::{Orientation, SortBy},
    loader::{LoadSource, SeriesLoader},
    view_configuration::ViewConfiguration,
    viewer::ViewerRole,
};
use glam::DVec3;
use tracing::{Level, debug, error, info, warn};

/// Render the central slices of a DICOM series to PNG images
#[derive(Debug, Parser)]
struct App {
    /// Directory holding the .dcm files of one series, defaults to the
    /// configured image directory
    directory: Option<PathBuf>,

    /// Directory receiving the images
    #[arg(short = 'o', long = "out", default_value = ".")]
    output: PathBuf,

    /// Program configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Colormap lookup table (planar RGB bytes), either a path or the name
    /// of a file in the configured LUT directory
    #[arg(long = "lut")]
    lut: Option<PathBuf>,

    /// Hold each colour up to the next control point instead of blending
    #[arg(long = "constant")]
    constant: bool,

    /// Hounsfield preset to start from (1-indexed, see --verbose output)
    #[arg(long = "preset")]
    preset: Option<usize>,

    /// Lower end of the window, in Hounsfield units
    #[arg(long = "min", allow_negative_numbers = true)]
    min: Option<f64>,

    /// Upper end of the window, in Hounsfield units
    #[arg(long = "max", allow_negative_numbers = true)]
    max: Option<f64>,

    /// Translation of the series along x, y and z, in millimetres
    #[arg(long = "translate", num_args = 3, allow_negative_numbers = true)]
    translate: Vec<f64>,

    /// Sort slices by Instance Number instead of Image Position (Patient)
    #[arg(long = "by-instance-number")]
    by_instance_number: bool,

    /// Print more information about the series and the rendering
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let app = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if app.verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        eprintln!("[ERROR] Could not set up global logging subscriber: {e}");
    });

    let config = match &app.config {
        Some(path) => ProgramConfiguration::from_file(path).unwrap_or_else(|e| {
            error!("{e}");
            std::process::exit(-1);
        }),
        None => ProgramConfiguration::default(),
    };

    let sort_by = if app.by_instance_number {
        SortBy::InstanceNumber
    } else {
        SortBy::ImagePositionPatient
    };
    let Some(directory) = app.directory.clone().or_else(|| config.image_directory.clone()) else {
        error!("No series directory given or configured");
        std::process::exit(-1);
    };
    let mut loader = SeriesLoader::new();
    let series = loader
        .load(LoadSource::Directory(directory), sort_by)
        .poll_until_done(|fraction| debug!("Loaded {:.0}%", fraction * 100.0))
        .await
        .unwrap_or_else(|e| {
            error!("{e}");
            std::process::exit(-2);
        });
    info!("{} with {:?} voxels", series.title(), series.volume.dim());

    let display = SeriesDisplay::new(series.clone()).shared();

    // window
    let initial = series.basic_hounsfield().unwrap_or_default();
    let mut hounsfield = HounsfieldControl::new(
        &series.compute_basic_hounsfield_ranges(),
        initial,
        &config,
    );
    for (index, preset) in hounsfield.presets().iter().enumerate() {
        debug!("Preset {}: {}", index + 1, preset.label);
    }
    if let Some(index) = app.preset {
        if !hounsfield.load_preset(index) {
            warn!("No Hounsfield preset {index}, keeping {}", hounsfield.hounsfield());
        }
    }
    hounsfield.set_keep_width(false);
    if let Some(min) = app.min {
        hounsfield.set_min(min);
    }
    if let Some(max) = app.max {
        hounsfield.set_max(max);
    }

    // colormap
    let mut colormap = ObservedColormap::default();
    colormap.connect(|event| debug!("Colormap event {event:?}"));
    let luts = config.lut_files().unwrap_or_else(|e| {
        warn!("{e}");
        Vec::new()
    });
    debug!("{} LUT files configured", luts.len());
    if let Some(lut) = &app.lut {
        // a bare name picks a file of the configured LUT directory
        let path = luts
            .iter()
            .find(|path| !lut.exists() && path.file_stem() == Some(lut.as_os_str()))
            .unwrap_or(lut);
        if let Err(e) = colormap.load_from_lut_file(path) {
            error!("{}: {e}", path.display());
            std::process::exit(-3);
        }
    }
    if app.constant {
        colormap.set_interpolation_mode(InterpolationMode::Constant);
    }

    let mut initial_config = ViewConfiguration::new();
    hounsfield.apply(&mut initial_config);
    initial_config.set_colormap(colormap.colormap().clone());

    let mut window_editor =
        ViewConfigurationEditor::new(EditorKind::HounsfieldColormap, initial_config);
    let mut transform_editor =
        ViewConfigurationEditor::new(EditorKind::TranslationRotation, ViewConfiguration::new());
    for editor in [&mut window_editor, &mut transform_editor] {
        let display = Rc::clone(&display);
        editor.connect(move |update| {
            display
                .borrow_mut()
                .update_view_configuration(&update.config, update.param)
        });
        editor.reset();
    }

    if let [x, y, z] = app.translate[..] {
        transform_editor.edit(|config| config.set_translation(DVec3::new(x, y, z)));
        transform_editor.accept();
    }

    display
        .borrow_mut()
        .connect(|update| debug!("Display applied {:?}", update.param));

    if let Err(e) = std::fs::create_dir_all(&app.output) {
        error!("{}: {e}", app.output.display());
        std::process::exit(-4);
    }

    for orientation in Orientation::ALL {
        let viewer = Rc::clone(display.borrow().viewer(ViewerRole::Slice(orientation)));
        let Some(center) = viewer
            .borrow()
            .as_slice()
            .map(|slice| slice.slice_range().absolute(0.5, true) + slice.slice_offset())
        else {
            continue;
        };
        display.borrow_mut().change_current_slice(orientation, center);

        let image = viewer.borrow().as_slice().and_then(|slice| slice.render());
        let Some(image) = image else {
            warn!("Nothing to show in {} view at {center}", orientation.name());
            continue;
        };
        let path = app.output.join(format!("{}.png", orientation.name()));
        image.save(&path).unwrap_or_else(|e| {
            error!("{}: {e}", path.display());
            std::process::exit(-4);
        });
        info!("{} slice at {center} saved to {}", orientation.name(), path.display());
    }

    let committed = window_editor.committed();
    let bar_range = committed.hounsfield_max_range();
    let colorbar = committed
        .colormap()
        .render_colorbar(bar_range, committed.hounsfield(), 256, 24);
    if let Some(colorbar) = colorbar {
        let path = app.output.join("colorbar.png");
        let boundaries = committed
            .colormap()
            .colorbar_boundaries(bar_range, committed.hounsfield());
        colorbar.save(&path).unwrap_or_else(|e| {
            error!("{}: {e}", path.display());
            std::process::exit(-4);
        });
        info!("Colour bar {boundaries} saved to {}", path.display());
    }
}
