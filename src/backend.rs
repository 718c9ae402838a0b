//! # Capture backend resolution
//!
//! Maps the logical backend names accepted by `vision_start` onto the capture API hint handed to
//! a [`DeviceBackend`](crate::DeviceBackend) when opening a device.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fmt;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Logical name to capture API table.
///
/// Anything not listed here resolves to [`CaptureApi::Any`].
const BACKENDS: &[(&str, CaptureApi)] = &[
    ("auto", CaptureApi::Any),
    ("avfoundation", CaptureApi::AvFoundation),
    ("msmf", CaptureApi::MediaFoundation),
    ("dshow", CaptureApi::DirectShow),
    ("v4l2", CaptureApi::V4l2),
];

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// The platform capture API a device should be opened through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureApi {
    /// Let the platform choose.
    Any,

    /// macOS AVFoundation
    AvFoundation,

    /// Windows Media Foundation
    MediaFoundation,

    /// Windows DirectShow
    DirectShow,

    /// Video for Linux 2
    V4l2,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CaptureApi {
    /// The logical name of this API, as accepted by [`resolve`].
    pub fn name(self) -> &'static str {
        BACKENDS
            .iter()
            .find(|(_, api)| *api == self)
            .map(|(name, _)| *name)
            .unwrap_or("auto")
    }
}

impl Default for CaptureApi {
    fn default() -> Self {
        CaptureApi::Any
    }
}

impl fmt::Display for CaptureApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Resolve a logical backend name into a capture API hint.
///
/// Matching ignores case and surrounding whitespace. Empty and unknown names fall back to
/// [`CaptureApi::Any`], this never fails.
pub fn resolve(name: &str) -> CaptureApi {
    let name = name.trim().to_ascii_lowercase();

    BACKENDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, api)| *api)
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
