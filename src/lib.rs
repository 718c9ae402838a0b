//! # Camera session and timed capture for vision tools
//!
//! This crate owns a single capture device on behalf of an agent process, captures single frames
//! or timed bursts of frames from it, and saves them to disk for other tools to pick up.
//! The hardware backend uses [`rscam`](https://github.com/loyd/rscam) to access cameras over
//! V4L2, therefore only Linux has a built in backend. Other platforms can plug in their own
//! [`DeviceBackend`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vision_camera::prelude::*;
//!
//! let mut session = CameraSessionBuilder::new()
//!     .build()
//!     .expect("No camera backend available");
//!
//! // Open camera 0 at 640x480, 15 fps. The device may pick something else, the properties
//! // reported back are what it actually negotiated.
//! let opened = session
//!     .open(&OpenRequest::new(0).resolution(640, 480).fps(15.0))
//!     .expect("Failed to open camera");
//! println!("{:?}", opened.props);
//!
//! // One frame
//! let frame = session.capture("frames", "png").expect("Failed to capture");
//!
//! // Five frames 200 ms apart
//! let burst = session
//!     .burst(&BurstRequest::new("frames").period_ms(200).duration_ms(1000))
//!     .expect("Burst failed");
//! assert_eq!(burst.paths.len(), 5);
//!
//! session.stop();
//! ```
//!
//! The session is also available as a set of JSON tools through [`ToolServer`], which the
//! `vision-camera` binary serves over stdin/stdout.

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use backend::{resolve as resolve_backend, CaptureApi};
pub use builder::CameraSessionBuilder;
pub use burst::{BurstPlan, BurstReport, BurstRequest};
pub use capture::{CaptureArtifact, ImageContainer};
pub use clock::{Clock, SystemClock};
pub use config::VisionConfig;
pub use device::{Device, DeviceBackend, DeviceProps, Frame, Negotiated, OpenHints};
pub use error::{Error, Result};
pub use files::{list_images, ImageEntry, ImageListing};
pub use session::{CameraSession, OpenOutcome, OpenRequest, ProbeEntry, ProbeReport, SessionStatus};
pub use tools::ToolServer;

#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub use v4l2::V4l2Backend;

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod backend;
pub mod burst;
pub mod capture;
pub mod clock;
pub mod config;
pub mod device;
pub mod files;
pub mod logging;
pub mod tools;

mod builder;
mod error;
mod session;

#[cfg(all(feature = "v4l2", target_os = "linux"))]
mod v4l2;

pub mod prelude {
    pub use crate::{BurstRequest, CameraSession, CameraSessionBuilder, OpenRequest};
    pub use crate::{Device, DeviceBackend, Frame, Negotiated, OpenHints};
    pub use crate::{Error, Result};
}
