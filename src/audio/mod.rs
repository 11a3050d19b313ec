pub mod probe;

pub use probe::{check_ffmpeg, measure_duration, probe_duration, wav_duration};

use crate::error::{LectureError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An owned, synthesized audio file with its measured duration.
///
/// Not `Clone`: the asset moves from narration unit to segment to timeline,
/// and is released exactly once when its final owner lets go of it.
/// Provisional assets (output of an attempt that has not been verified yet)
/// delete their file when dropped.
#[derive(Debug)]
pub struct AudioAsset {
    path: PathBuf,
    duration: f64,
    discard_on_drop: bool,
}

impl AudioAsset {
    /// A verified asset whose file outlives the handle.
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
            discard_on_drop: false,
        }
    }

    /// An unverified asset; its file is removed unless [`AudioAsset::keep`] is called.
    pub fn provisional(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
            discard_on_drop: true,
        }
    }

    pub fn keep(mut self) -> Self {
        self.discard_on_drop = false;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Check the asset is usable for composition.
    pub fn verify(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(LectureError::Asset(format!(
                "audio file missing: {}",
                self.path.display()
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(LectureError::Asset(format!(
                "audio {} has invalid duration {}",
                self.path.display(),
                self.duration
            )));
        }
        Ok(())
    }

    /// Release the handle, optionally deleting the file. Returns whether a
    /// file was removed.
    pub fn release(mut self, delete_file: bool) -> Result<bool> {
        self.discard_on_drop = false;
        if delete_file && self.path.exists() {
            std::fs::remove_file(&self.path)?;
            debug!("Deleted audio asset {}", self.path.display());
            return Ok(true);
        }
        Ok(false)
    }
}

impl Drop for AudioAsset {
    fn drop(&mut self) {
        if self.discard_on_drop && self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!("Discarded provisional audio {}", self.path.display()),
                Err(e) => warn!("Could not discard {}: {}", self.path.display(), e),
            }
        }
    }
}
