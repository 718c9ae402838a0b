//! # `vision_camera` Error module
//!
//! Provides abstractions over errors which can occur during this crate's use.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

use serde_any;
use thiserror;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Result type used by faillible functions inside the `vision_camera` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors which can occur during use of the `vision_camera` crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot find file at {0:?}")]
    FileNotFound(PathBuf),

    #[error("Error deserialising data: {0}")]
    DeserialisationError(serde_any::Error),

    #[error("Failed to open camera index {index} (backend={backend}): {reason}")]
    DeviceUnavailable {
        index: u32,
        backend: String,
        reason: String,
    },

    #[error("Camera not open")]
    NotOpen,

    #[error("Failed to read frame: {0}")]
    FrameReadError(String),

    #[error("Error occured while converting a camera frame: {0}")]
    ImageConversionError(image::ImageError),

    #[error("Failed to encode frame as {container}: {source}")]
    EncodeError {
        container: &'static str,
        source: image::ImageError,
    },

    #[error("Failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid directory {path:?}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("Invalid burst plan: {0}")]
    InvalidBurstPlan(String),

    #[error("Burst aborted at frame {index} after saving {} frame(s): {cause}", .saved.len())]
    BurstAborted {
        index: u32,
        cause: Box<Error>,
        saved: Vec<PathBuf>,
    },

    #[error("No device backend available: {0}")]
    NoBackend(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Error {
    /// Paths of artifacts which were persisted before the operation failed.
    ///
    /// Only a burst can fail part way through, every other error saved nothing.
    pub fn saved_paths(&self) -> &[PathBuf] {
        match self {
            Error::BurstAborted { saved, .. } => saved,
            _ => &[],
        }
    }
}
