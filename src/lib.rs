//! # DICOM-viewer library
//!
//! This crate holds the display pipeline of a multi-series DICOM viewer:
//! how a window in Hounsfield units and a colormap turn into the colour and
//! opacity functions of the viewers showing a series.
//!
//! It builds on the dicom-rs ecosystem to load a series into a
//! [`volume::Volume`] (in parallel using rayon where available) together
//! with its rescale parameters and the windows stored in its files.
//! A series is shown by a [`display::SeriesDisplay`]: one 3D viewer and
//! one slice viewer for each of the three medical axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! Editors produce [`view_configuration::ViewConfiguration`] broadcasts,
//! each naming the one parameter that changed, and every viewer recomputes
//! only what depends on it. Several displays can be fused into a
//! [`display::MergedDisplay`], whose viewers show all linked series
//! together.
//!
//! Everything above the loader is single-threaded: displays and viewers are
//! shared through `Rc<RefCell<_>>` and notify each other synchronously.
//!
//! # Roadmap
//!
//!  - Oblique reslicing of rotated series
//!  - GPU ray casting for the 3D viewer
//!  - Caching of rendered slices
//!
//! # Examples
//!
//! ## Windowing a series
//!
//! Load the series in the dicom/ directory, show the soft tissue window
//! through the default grayscale colormap and save the central axial slice.
//!
//! ```no_run
//! # use dicom_viewer::{display::SeriesDisplay, enums::{Orientation, SortBy}};
//! # use dicom_viewer::{range::Range, view_configuration::{ViewConfiguration, ViewParam}};
//! # use dicom_viewer::{viewer::ViewerRole, volume_loader::VolumeLoader};
//! # use std::{ops::ControlFlow, sync::Arc};
//! let series = VolumeLoader::load_from_directory("dicom", SortBy::InstanceNumber, |_| {
//!     ControlFlow::Continue(())
//! })
//! .expect("should have loaded files from directory");
//! let mut display = SeriesDisplay::new(Arc::new(series));
//!
//! let mut config = ViewConfiguration::new();
//! config.set_hounsfield(Range::new(-160.0, 240.0), Range::new(-1024.0, 3071.0));
//! display.update_view_configuration(&config, ViewParam::All);
//!
//! let viewer = display.viewer(ViewerRole::Slice(Orientation::Axial)).borrow();
//! let slice = viewer.as_slice().expect("should be a slice viewer");
//! let image = slice.render().expect("should show a slice");
//! image.save("axial.png");
//! ```

pub mod color;
pub mod colormap;
pub mod config;
pub mod display;
pub mod editor;
pub mod enums;
pub mod loader;
pub mod range;
pub mod series;
pub mod signal;
pub mod transfer_function;
pub mod view_configuration;
pub mod viewer;
pub mod volume;
pub mod volume_loader;
