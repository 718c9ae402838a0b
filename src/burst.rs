//! # Burst Capture Module
//!
//! Timed multi-frame capture from the open session.
//!
//! Every frame's deadline is anchored to the instant the burst started rather than to when the
//! previous frame finished, so per-frame overhead does not accumulate across the burst. A frame
//! whose deadline has already passed is taken immediately, late frames are never made up for.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::capture::{encode, ensure_dir, persist, CaptureArtifact, ImageContainer};
use crate::error::{Error, Result};
use crate::session::CameraSession;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Progress is logged for the first frame, the last, and every this many in between.
const PROGRESS_EVERY: u32 = 5;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Parameters for [`CameraSession::burst`].
#[derive(Debug, Clone, PartialEq)]
pub struct BurstRequest {
    /// Number of frames, ignored when `duration_ms` is positive
    pub n: u32,

    /// Target time between frames
    pub period_ms: u64,

    pub save_dir: PathBuf,

    /// Requested container, see [`ImageContainer::from_format`]
    pub format: String,

    /// Frames read and thrown away before timing starts
    pub warmup: u32,

    /// Total burst length, `0` to use `n` instead
    pub duration_ms: u64,
}

/// A burst request resolved into what will actually be done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstPlan {
    pub count: u32,
    pub period: Duration,
    pub warmup: u32,
    pub container: ImageContainer,
}

/// Result of a completed burst.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurstReport {
    /// Saved frames in capture order
    pub paths: Vec<PathBuf>,

    pub mime: &'static str,
    pub width: u32,
    pub height: u32,

    /// Effective frame count
    pub n: u32,

    pub period_ms: u64,
    pub duration_ms: u64,
    pub save_dir: PathBuf,

    #[serde(skip)]
    pub frames: Vec<CaptureArtifact>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl BurstRequest {
    /// A burst of 8 JPEG frames 150 ms apart after 3 warmup frames.
    pub fn new<P: Into<PathBuf>>(save_dir: P) -> Self {
        Self {
            n: 8,
            period_ms: 150,
            save_dir: save_dir.into(),
            format: String::from("jpg"),
            warmup: 3,
            duration_ms: 0,
        }
    }

    pub fn count(mut self, n: u32) -> Self {
        self.n = n;

        self
    }

    pub fn period_ms(mut self, period_ms: u64) -> Self {
        self.period_ms = period_ms;

        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;

        self
    }

    pub fn warmup(mut self, warmup: u32) -> Self {
        self.warmup = warmup;

        self
    }

    pub fn format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = format.into();

        self
    }
}

impl BurstPlan {
    /// Resolve the effective frame count, period and container for a request.
    pub fn resolve(request: &BurstRequest) -> Result<Self> {
        Ok(Self {
            count: effective_count(request.n, request.period_ms, request.duration_ms)?,
            period: Duration::from_millis(request.period_ms),
            warmup: request.warmup,
            container: ImageContainer::from_format(&request.format),
        })
    }
}

impl CameraSession {
    /// Capture a timed sequence of frames into `request.save_dir`.
    ///
    /// Blocks for the whole burst. If any frame fails the burst stops there and
    /// [`Error::BurstAborted`] carries the paths saved so far, the session stays open.
    pub fn burst(&mut self, request: &BurstRequest) -> Result<BurstReport> {
        let quality = self.jpeg_quality;
        let clock = &self.clock;
        let active = self.active.as_mut().ok_or(Error::NotOpen)?;

        let plan = BurstPlan::resolve(request)?;
        ensure_dir(&request.save_dir)?;

        if !active.device.minimize_buffering() {
            debug!("Device does not support reducing its frame buffer");
        }

        for i in 0..plan.warmup {
            if let Err(e) = active.device.read_frame() {
                debug!("Discarding failed warmup read {}: {}", i, e);
            }
        }

        let width = active.props.width;
        let height = active.props.height;
        let mut frames: Vec<CaptureArtifact> = Vec::new();

        let t0 = clock.now();

        for i in 0..plan.count {
            clock.sleep_until(t0 + plan.period * i);

            let saved = active
                .device
                .read_frame()
                .and_then(|frame| encode(frame, plan.container, quality))
                .and_then(|bytes| {
                    persist(&request.save_dir, "burst", Some(i), plan.container, &bytes)
                });

            let path = match saved {
                Ok(p) => p,
                Err(cause) => {
                    warn!("Burst aborted at frame {}/{}: {}", i + 1, plan.count, cause);
                    return Err(Error::BurstAborted {
                        index: i,
                        cause: Box::new(cause),
                        saved: frames.into_iter().map(|f| f.path).collect(),
                    });
                }
            };

            if i == 0 || (i + 1) % PROGRESS_EVERY == 0 || i + 1 == plan.count {
                info!("Burst capture {}/{} saved {:?}", i + 1, plan.count, path.file_name());
            }

            frames.push(CaptureArtifact {
                path,
                mime: plan.container.mime(),
                width,
                height,
                index: Some(i),
                elapsed: clock.now().saturating_duration_since(t0),
            });
        }

        Ok(BurstReport {
            paths: frames.iter().map(|f| f.path.clone()).collect(),
            mime: plan.container.mime(),
            width,
            height,
            n: plan.count,
            period_ms: request.period_ms,
            duration_ms: request.duration_ms,
            save_dir: request.save_dir.clone(),
            frames,
        })
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// The number of frames a burst will take.
///
/// With a positive `duration_ms` this is `duration_ms / period_ms` rounded to the nearest
/// integer (halves round up), otherwise `n`. Never less than one.
pub fn effective_count(n: u32, period_ms: u64, duration_ms: u64) -> Result<u32> {
    if duration_ms == 0 {
        return Ok(n.max(1));
    }

    if period_ms == 0 {
        return Err(Error::InvalidBurstPlan(String::from(
            "period_ms must be positive when duration_ms is given",
        )));
    }

    let duration = u128::from(duration_ms);
    let period = u128::from(period_ms);
    let rounded = (2 * duration + period) / (2 * period);

    Ok(rounded.max(1).min(u128::from(u32::MAX)) as u32)
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
