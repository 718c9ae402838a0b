//! # Configuration Module
//!
//! Defaults for every tool argument. A configuration file only needs to name the values it
//! changes, anything missing keeps its default.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_any;

use crate::builder::DEFAULT_JPEG_QUALITY;
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Tool defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub camera: CameraDefaults,
    pub capture: CaptureDefaults,
    pub burst: BurstDefaults,
    pub probe: ProbeDefaults,
    pub images: ImageDefaults,
}

/// Defaults for `vision_start`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraDefaults {
    pub index: u32,
    pub width: i64,
    pub height: i64,
    pub fps: f64,
    pub backend: String,
}

/// Defaults for `vision_capture`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    pub save_dir: String,
    pub format: String,
    pub jpeg_quality: u8,
}

/// Defaults for `vision_burst`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BurstDefaults {
    pub n: u32,
    pub period_ms: u64,
    pub save_dir: String,
    pub format: String,
    pub warmup: u32,
    pub duration_ms: u64,
}

/// Defaults for `list_cameras`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeDefaults {
    pub max_index: u32,
}

/// Defaults for `list_images`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageDefaults {
    pub directory: String,
    pub recursive: bool,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl VisionConfig {
    /// Load the configuration from a file.
    ///
    /// The file type will be guessed from its extension, any file type supported by
    /// [`serde_any`](https://docs.rs/serde_any/0.5.0/serde_any/) is supported.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(Error::FileNotFound(path.as_ref().to_path_buf()));
        }

        serde_any::from_file(path).map_err(Error::DeserialisationError)
    }
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 15.0,
            backend: String::from("auto"),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            save_dir: String::from("~/.vision_frames"),
            format: String::from("jpg"),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for BurstDefaults {
    fn default() -> Self {
        Self {
            n: 8,
            period_ms: 150,
            save_dir: String::from("."),
            format: String::from("jpg"),
            warmup: 3,
            duration_ms: 0,
        }
    }
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self { max_index: 10 }
    }
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            directory: String::from("."),
            recursive: false,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Expand a leading `~` into the user's home directory.
///
/// Paths without one, and paths on systems with no known home directory, are returned as is.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(h) = dirs::home_dir() {
            return h;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(h) = dirs::home_dir() {
            return h.join(rest);
        }
    }

    PathBuf::from(path)
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
