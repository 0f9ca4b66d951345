//! Background series loading.
//!
//! A load runs on tokio's blocking pool and publishes the loaded fraction,
//! which the caller polls. Starting a new load through the same
//! [`SeriesLoader`] supersedes the running one: it stops at its next
//! progress report and its result is discarded.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use web_time::Instant;

use crate::enums::SortBy;
use crate::series::SeriesData;
use crate::volume_loader::{VolumeLoader, VolumeLoaderError};

/// How often [`LoadTask::poll_until_done`] reads the progress.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Load superseded by a newer one")]
    Superseded,

    #[error(transparent)]
    Failed(#[from] VolumeLoaderError),

    #[error("Load task failed: {0}")]
    Join(String),
}

/// Loaded fraction in `[0, 1]`, shared between the loading task and its
/// observers.
#[derive(Debug, Clone, Default)]
pub struct LoadProgress(Arc<AtomicU64>);

impl LoadProgress {
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, fraction: f64) {
        self.0
            .store(fraction.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub enum LoadSource {
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

type LoadResult = Result<SeriesData, VolumeLoaderError>;

#[derive(Debug)]
pub struct LoadTask {
    handle: JoinHandle<LoadResult>,
    progress: LoadProgress,
    superseded: Arc<AtomicBool>,
    started: Instant,
}

impl LoadTask {
    /// Run `job` on the blocking pool. The job reports its progress through
    /// the callback it receives and should stop once the callback breaks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(&mut dyn FnMut(f64) -> ControlFlow<()>) -> LoadResult + Send + 'static,
    {
        let progress = LoadProgress::default();
        let superseded = Arc::new(AtomicBool::new(false));

        let handle = {
            let progress = progress.clone();
            let superseded = superseded.clone();
            tokio::task::spawn_blocking(move || {
                let mut report = |fraction: f64| {
                    progress.set(fraction);
                    if superseded.load(Ordering::Relaxed) {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                };
                job(&mut report)
            })
        };

        Self {
            handle,
            progress,
            superseded,
            started: Instant::now(),
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    pub fn progress_handle(&self) -> LoadProgress {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Relaxed)
    }

    /// Wait for the load to end. A superseded load never yields its series.
    pub async fn join(self) -> Result<Arc<SeriesData>, LoadError> {
        let result = self
            .handle
            .await
            .map_err(|error| LoadError::Join(error.to_string()))?;

        if self.superseded.load(Ordering::Relaxed) {
            debug!("Discarding superseded load");
            return Err(LoadError::Superseded);
        }
        match result {
            Ok(series) => {
                info!("Series {} ready after {:?}", series.title(), self.started.elapsed());
                Ok(Arc::new(series))
            }
            Err(error) => {
                warn!("Series load failed: {error}");
                Err(LoadError::Failed(error))
            }
        }
    }

    /// Hand the progress to `on_progress` every [`POLL_INTERVAL`] until the
    /// load ends, then join it.
    pub async fn poll_until_done(self, mut on_progress: impl FnMut(f64)) -> Result<Arc<SeriesData>, LoadError> {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        while !self.is_finished() {
            interval.tick().await;
            on_progress(self.progress());
        }
        on_progress(self.progress());
        self.join().await
    }
}

/// Starts loads, superseding the previous one each time.
#[derive(Debug, Default)]
pub struct SeriesLoader {
    current: Option<Arc<AtomicBool>>,
}

impl SeriesLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, source: LoadSource, sort_by: SortBy) -> LoadTask {
        info!("Loading series from {source:?}");
        self.load_with(move |progress| match source {
            LoadSource::Directory(path) => VolumeLoader::load_from_directory(path, sort_by, progress),
            LoadSource::Files(paths) => VolumeLoader::load_from_file_paths(&paths, sort_by, progress),
        })
    }

    /// Start `job` as the current load.
    pub fn load_with<F>(&mut self, job: F) -> LoadTask
    where
        F: FnOnce(&mut dyn FnMut(f64) -> ControlFlow<()>) -> LoadResult + Send + 'static,
    {
        if let Some(previous) = self.current.take() {
            previous.store(true, Ordering::Relaxed);
        }
        let task = LoadTask::spawn(job);
        self.current = Some(task.superseded.clone());
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;
    use ndarray::Array3;

    fn small_series() -> SeriesData {
        let data = Array3::from_shape_vec((1, 1, 2), vec![0.0, 10.0]).unwrap();
        SeriesData::new(Volume::new(data, (1.0, 1.0, 1.0)))
    }

    #[tokio::test]
    async fn finished_load_hands_over_series() {
        let mut loader = SeriesLoader::new();
        let task = loader.load_with(|progress| {
            for step in 1..=4 {
                if progress(step as f64 / 4.0).is_break() {
                    return Err(VolumeLoaderError::Cancelled);
                }
            }
            Ok(small_series())
        });

        let mut seen = Vec::new();
        let series = task.poll_until_done(|fraction| seen.push(fraction)).await.unwrap();

        assert_eq!(series.volume.dim(), (1, 1, 2));
        assert_eq!(seen.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn new_load_supersedes_running_one() {
        let mut loader = SeriesLoader::new();
        let first = loader.load_with(|progress| {
            for _ in 0..2000 {
                if progress(0.5).is_break() {
                    return Err(VolumeLoaderError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(small_series())
        });
        let second = loader.load_with(|_| Ok(small_series()));

        assert!(first.is_superseded());
        assert!(!second.is_superseded());
        assert!(matches!(first.join().await, Err(LoadError::Superseded)));
        assert!(second.join().await.is_ok());
    }

    #[tokio::test]
    async fn failed_load_reports_error() {
        let mut loader = SeriesLoader::new();
        let task = loader.load_with(|_| Err(VolumeLoaderError::NoValidImages));
        assert!(matches!(
            task.join().await,
            Err(LoadError::Failed(VolumeLoaderError::NoValidImages))
        ));
    }

    #[tokio::test]
    async fn missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = SeriesLoader::new();
        let task = loader.load(
            LoadSource::Directory(dir.path().join("absent")),
            SortBy::default(),
        );
        assert!(matches!(
            task.join().await,
            Err(LoadError::Failed(VolumeLoaderError::Io(_)))
        ));
    }

    #[test]
    fn progress_is_clamped() {
        let progress = LoadProgress::default();
        assert_eq!(progress.get(), 0.0);
        progress.set(0.75);
        assert_eq!(progress.get(), 0.75);
        progress.set(3.0);
        assert_eq!(progress.get(), 1.0);
    }
}
