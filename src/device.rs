//! # Device Module
//!
//! The seam between the camera session and the hardware. A [`DeviceBackend`] opens devices by
//! index, each returning a [`Device`] handle which owns the hardware until it is dropped.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use image::RgbImage;
use serde::Serialize;

use crate::backend::CaptureApi;
use crate::error::Result;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// An open capture device.
///
/// Dropping the handle must release the underlying hardware.
pub trait Device {
    /// The properties the device actually honours, which may differ from what was requested.
    fn negotiated(&self) -> Negotiated;

    /// Read a single frame from the device.
    ///
    /// Blocks until the device produces a frame or reports an error.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Ask the device to keep as few frames buffered as possible.
    ///
    /// Returns `false` if the device doesn't support this, which is not an error.
    fn minimize_buffering(&mut self) -> bool {
        false
    }
}

/// Opens capture devices.
pub trait DeviceBackend {
    /// Open the device at `index` through the given capture API, applying `hints` where the
    /// hardware allows it.
    fn open(&self, index: u32, api: CaptureApi, hints: &OpenHints) -> Result<Box<dyn Device>>;
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Requested device properties, `None` leaves the device default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpenHints {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

/// Properties read back from an open device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Negotiated {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Negotiated properties of the session's device along with the backend it was opened through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProps {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub backend: String,
}

/// A single decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl OpenHints {
    /// Build hints from raw requested values, ignoring anything that isn't positive.
    pub fn from_requested(width: i64, height: i64, fps: f64) -> Self {
        let positive = |v: i64| if v > 0 { u32::try_from(v).ok() } else { None };

        Self {
            width: positive(width),
            height: positive(height),
            fps: if fps > 0.0 { Some(fps) } else { None },
        }
    }
}

impl DeviceProps {
    pub(crate) fn new(negotiated: Negotiated, api: CaptureApi) -> Self {
        Self {
            width: negotiated.width,
            height: negotiated.height,
            fps: negotiated.fps,
            backend: api.name().to_string(),
        }
    }
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
