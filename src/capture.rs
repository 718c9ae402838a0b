//! # Frame Capture Module
//!
//! Encoding of frames into image containers and persisting them to disk under collision
//! resistant names, plus single frame capture from the open session.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use image::{DynamicImage, ImageOutputFormat};
use log::{debug, warn};
use serde::Serialize;

use crate::device::Frame;
use crate::error::{Error, Result};
use crate::session::CameraSession;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Fresh names drawn before giving up when the target file already exists.
const MAX_NAME_ATTEMPTS: u32 = 8;

/// Process-wide sequence, appended to every artifact name.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Image container a frame is encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageContainer {
    Jpeg,
    Png,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A frame persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureArtifact {
    pub path: PathBuf,

    pub mime: &'static str,

    /// Width negotiated by the session, not measured from the frame
    pub width: u32,

    /// Height negotiated by the session, not measured from the frame
    pub height: u32,

    /// Position within a burst
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Time since the start of the burst at which the frame was saved
    #[serde(skip)]
    pub elapsed: Duration,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl ImageContainer {
    /// Pick the container for a requested format.
    ///
    /// `jpg` and `jpeg` (any case) select JPEG, anything else selects PNG.
    pub fn from_format(format: &str) -> Self {
        match format.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ImageContainer::Jpeg,
            _ => ImageContainer::Png,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageContainer::Jpeg => "image/jpeg",
            ImageContainer::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageContainer::Jpeg => "jpg",
            ImageContainer::Png => "png",
        }
    }

    fn output_format(self, jpeg_quality: u8) -> ImageOutputFormat {
        match self {
            ImageContainer::Jpeg => ImageOutputFormat::Jpeg(jpeg_quality),
            ImageContainer::Png => ImageOutputFormat::Png,
        }
    }
}

impl fmt::Display for ImageContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl CameraSession {
    /// Capture one frame and save it into `save_dir`.
    ///
    /// The session must already be open, it is never opened implicitly. A failed read leaves the
    /// session open.
    pub fn capture<P: AsRef<Path>>(&mut self, save_dir: P, format: &str) -> Result<CaptureArtifact> {
        let quality = self.jpeg_quality;
        let active = self.active_mut()?;

        let frame = active.device.read_frame()?;

        let container = ImageContainer::from_format(format);
        let bytes = encode(frame, container, quality)?;

        ensure_dir(save_dir.as_ref())?;
        let path = persist(save_dir.as_ref(), "frame", None, container, &bytes)?;

        debug!("Captured frame to {:?}", path);

        Ok(CaptureArtifact {
            path,
            mime: container.mime(),
            width: active.props.width,
            height: active.props.height,
            index: None,
            elapsed: Duration::from_secs(0),
        })
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Encode a frame into the given container.
pub fn encode(frame: Frame, container: ImageContainer, jpeg_quality: u8) -> Result<Vec<u8>> {
    let image = DynamicImage::ImageRgb8(frame.into_image());
    let mut bytes = Vec::new();

    image
        .write_to(&mut bytes, container.output_format(jpeg_quality))
        .map_err(|e| Error::EncodeError {
            container: container.mime(),
            source: e,
        })?;

    Ok(bytes)
}

/// Generate an artifact file name.
///
/// Names are `{prefix}_{date}_{time}_{millis}_{sequence}[_{index}].{ext}`, the sequence being
/// unique within the process, so two names never collide even inside the same millisecond.
pub fn artifact_name(prefix: &str, index: Option<u32>, container: ImageContainer) -> String {
    let now = Local::now();
    let millis = now.timestamp_subsec_millis().min(999);
    let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    match index {
        Some(i) => format!(
            "{}_{}_{:03}_{:04}_{:02}.{}",
            prefix,
            now.format("%Y%m%d_%H%M%S"),
            millis,
            sequence,
            i,
            container.extension()
        ),
        None => format!(
            "{}_{}_{:03}_{:04}.{}",
            prefix,
            now.format("%Y%m%d_%H%M%S"),
            millis,
            sequence,
            container.extension()
        ),
    }
}

// -----------------------------------------------------------------------------------------------
// CRATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Make sure `dir` exists and is a directory, creating it and any parents if needed.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::InvalidDirectory {
            path: dir.to_path_buf(),
            reason: String::from("not a directory"),
        });
    }

    fs::create_dir_all(dir).map_err(|e| Error::InvalidDirectory {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `bytes` to a new file in `dir`, never overwriting an existing file.
pub(crate) fn persist(
    dir: &Path,
    prefix: &str,
    index: Option<u32>,
    container: ImageContainer,
    bytes: &[u8],
) -> Result<PathBuf> {
    let mut path = dir.join(artifact_name(prefix, index, container));

    for _ in 0..MAX_NAME_ATTEMPTS {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let written = file.write_all(bytes).and_then(|_| file.flush());
                drop(file);

                return discard_on_error(path, written);
            }
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                path = dir.join(artifact_name(prefix, index, container));
            }
            Err(e) => return Err(Error::WriteError { path, source: e }),
        }
    }

    Err(Error::WriteError {
        path,
        source: std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
    })
}

/// Pass `path` through if it was written, otherwise remove the partial file.
fn discard_on_error(path: PathBuf, written: std::io::Result<()>) -> Result<PathBuf> {
    match written {
        Ok(()) => Ok(path),
        Err(e) => {
            if let Err(rm) = fs::remove_file(&path) {
                warn!("Could not remove partial artifact {:?}: {}", path, rm);
            }

            Err(Error::WriteError { path, source: e })
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
