//! # `CameraSessionBuilder` implementation
//!
//! This module implements the builder for camera session objects.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use crate::clock::{Clock, SystemClock};
use crate::config::VisionConfig;
use crate::device::DeviceBackend;
use crate::error::Result;
use crate::session::CameraSession;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Builds a [`CameraSession`].
///
/// Without an explicit backend the session uses the V4L2 backend when the `v4l2` feature is
/// enabled on Linux, and fails to build otherwise.
pub struct CameraSessionBuilder {
    backend: Option<Box<dyn DeviceBackend>>,

    clock: Option<Box<dyn Clock>>,

    jpeg_quality: u8,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CameraSessionBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            clock: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Take the encoder settings from a loaded configuration.
    pub fn config(self, config: &VisionConfig) -> Self {
        self.jpeg_quality(config.capture.jpeg_quality)
    }

    /// Set the backend used to open devices.
    pub fn backend<B: DeviceBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));

        self
    }

    /// Set the clock used to time bursts.
    ///
    /// Default is [`SystemClock`].
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Box::new(clock));

        self
    }

    /// Set the JPEG quality, clamped to `1..=100`.
    ///
    /// Default value is 95.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.max(1).min(100);

        self
    }

    /// Build the session, which starts out closed.
    pub fn build(self) -> Result<CameraSession> {
        let backend = match self.backend {
            Some(b) => b,
            None => default_backend()?,
        };

        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock) as Box<dyn Clock>);

        Ok(CameraSession::new(backend, clock, self.jpeg_quality))
    }
}

impl Default for CameraSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

#[cfg(all(feature = "v4l2", target_os = "linux"))]
fn default_backend() -> Result<Box<dyn DeviceBackend>> {
    Ok(Box::new(crate::v4l2::V4l2Backend::new()))
}

#[cfg(not(all(feature = "v4l2", target_os = "linux")))]
fn default_backend() -> Result<Box<dyn DeviceBackend>> {
    Err(crate::error::Error::NoBackend(String::from(
        "built without a hardware backend, enable the `v4l2` feature on Linux",
    )))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
