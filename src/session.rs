//! # Camera Session Module
//!
//! This module provides the camera session, the single owner of the open capture device. The
//! session is either closed or holds exactly one device handle, every operation goes through
//! `&mut self` so access is serialised by whoever owns the session.
//!
//! Single frame capture and timed bursts are implemented on the session in the
//! [`capture`](crate::capture) and [`burst`](crate::burst) modules.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use crate::backend::{self, CaptureApi};
use crate::clock::Clock;
use crate::device::{Device, DeviceBackend, DeviceProps, OpenHints};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// Owner of the (at most one) open capture device.
///
/// Build one with [`CameraSessionBuilder`](crate::CameraSessionBuilder).
pub struct CameraSession {
    backend: Box<dyn DeviceBackend>,

    pub(crate) clock: Box<dyn Clock>,

    pub(crate) jpeg_quality: u8,

    pub(crate) active: Option<ActiveDevice>,
}

/// The open device and what it negotiated.
pub(crate) struct ActiveDevice {
    pub(crate) device: Box<dyn Device>,
    pub(crate) index: u32,
    pub(crate) props: DeviceProps,
}

/// Parameters for [`CameraSession::open`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    /// Device index
    pub index: u32,

    /// Requested width, values <= 0 leave the device default
    pub width: i64,

    /// Requested height, values <= 0 leave the device default
    pub height: i64,

    /// Requested frame rate, values <= 0 leave the device default
    pub fps: f64,

    /// Logical backend name, see [`backend::resolve`]
    pub backend: String,
}

/// Result of a successful [`CameraSession::open`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOutcome {
    /// `false` if the session was already open and nothing changed
    #[serde(skip)]
    pub opened: bool,

    pub message: String,
    pub props: DeviceProps,
    pub index: u32,
}

/// Snapshot of the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub open: bool,
    pub index: Option<u32>,
    pub props: Option<DeviceProps>,
}

/// Result of [`CameraSession::probe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub cameras: Vec<ProbeEntry>,
}

/// What probing one device index found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeEntry {
    pub index: u32,
    pub open: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    /// Set when the entry describes the session's own device, which is never reopened.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CameraSession {
    pub(crate) fn new(
        backend: Box<dyn DeviceBackend>,
        clock: Box<dyn Clock>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            backend,
            clock,
            jpeg_quality,
            active: None,
        }
    }

    /// Open the camera.
    ///
    /// If a camera is already open this succeeds without touching it, even if the requested
    /// parameters differ. The reported properties are always those read back from the device.
    pub fn open(&mut self, request: &OpenRequest) -> Result<OpenOutcome> {
        if let Some(ref active) = self.active {
            return Ok(OpenOutcome {
                opened: false,
                message: String::from("Camera already open"),
                props: active.props.clone(),
                index: active.index,
            });
        }

        let api = backend::resolve(&request.backend);
        let hints = OpenHints::from_requested(request.width, request.height, request.fps);

        info!(
            "Opening camera index={} backend={} width={} height={} fps={}",
            request.index, api, request.width, request.height, request.fps
        );

        let device = self
            .backend
            .open(request.index, api, &hints)
            .map_err(|e| {
                warn!("Failed to open camera index {}: {}", request.index, e);
                e
            })?;

        let props = DeviceProps::new(device.negotiated(), api);
        info!("Camera open with props: {:?}", props);

        self.active = Some(ActiveDevice {
            device,
            index: request.index,
            props: props.clone(),
        });

        Ok(OpenOutcome {
            opened: true,
            message: String::from("Camera opened"),
            props,
            index: request.index,
        })
    }

    /// Report whether a camera is open and what it negotiated.
    pub fn status(&self) -> SessionStatus {
        match self.active {
            Some(ref active) => SessionStatus {
                open: true,
                index: Some(active.index),
                props: Some(active.props.clone()),
            },
            None => SessionStatus {
                open: false,
                index: None,
                props: None,
            },
        }
    }

    /// Whether a camera is currently open.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Release the camera if one is open.
    ///
    /// Returns `true` if a device was released.
    pub fn close(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                info!("Releasing camera index={}", active.index);
                true
            }
            None => false,
        }
    }

    /// Release the camera. Always succeeds.
    pub fn stop(&mut self) {
        self.close();
    }

    /// Probe device indices `0..max_index` one at a time.
    ///
    /// Each device is opened with default properties, read back and released before the next
    /// index is tried. The session's own device is never reopened, its entry is taken from the
    /// session status and marked `active`.
    pub fn probe(&self, max_index: u32) -> ProbeReport {
        let mut cameras = Vec::new();

        for index in 0..max_index {
            if let Some(ref active) = self.active {
                if active.index == index {
                    cameras.push(ProbeEntry {
                        index,
                        open: true,
                        width: Some(active.props.width),
                        height: Some(active.props.height),
                        fps: Some(active.props.fps),
                        active: true,
                        error: None,
                    });
                    continue;
                }
            }

            // The handle is dropped at the end of this statement, before the next index
            let entry = match self.backend.open(index, CaptureApi::Any, &OpenHints::default()) {
                Ok(device) => {
                    let negotiated = device.negotiated();
                    ProbeEntry {
                        index,
                        open: true,
                        width: Some(negotiated.width),
                        height: Some(negotiated.height),
                        fps: Some(negotiated.fps),
                        active: false,
                        error: None,
                    }
                }
                Err(e) => ProbeEntry {
                    index,
                    open: false,
                    width: None,
                    height: None,
                    fps: None,
                    active: false,
                    error: Some(e.to_string()),
                },
            };

            cameras.push(entry);
        }

        ProbeReport { cameras }
    }

    /// The open device and its index, or [`Error::NotOpen`].
    pub(crate) fn active_mut(&mut self) -> Result<&mut ActiveDevice> {
        self.active.as_mut().ok_or(Error::NotOpen)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl OpenRequest {
    /// Request the device at `index` with default properties through the automatic backend.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            width: 0,
            height: 0,
            fps: 0.0,
            backend: String::from("auto"),
        }
    }

    pub fn resolution(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;

        self
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.fps = fps;

        self
    }

    pub fn backend<S: Into<String>>(mut self, backend: S) -> Self {
        self.backend = backend.into();

        self
    }
}
