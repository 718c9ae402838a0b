//! # Shared test fixtures
//!
//! A fake capture backend which counts open handles and can be told to fail reads, a manually
//! advanced clock, and scratch directories.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};

use vision_camera::prelude::*;
use vision_camera::{CaptureApi, Clock};

// -----------------------------------------------------------------------------------------------
// CLOCK
// -----------------------------------------------------------------------------------------------

/// Clock which only moves when slept on or advanced.
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::from_secs(0))),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }

    /// Time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

// -----------------------------------------------------------------------------------------------
// FAKE DEVICES
// -----------------------------------------------------------------------------------------------

/// Counters shared between a fake backend, its devices and the test.
#[derive(Default)]
pub struct FakeState {
    pub open_handles: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    pub opens: Mutex<Vec<u32>>,
    pub reads: AtomicUsize,

    /// Reads the device had served each time it was asked to reduce buffering
    pub buffering_requests: Mutex<Vec<usize>>,

    /// Clock time at the start of every read, when the backend has a clock
    pub read_times: Mutex<Vec<Duration>>,
}

impl FakeState {
    pub fn handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn opens_of(&self, index: u32) -> usize {
        self.opens.lock().unwrap().iter().filter(|i| **i == index).count()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn buffering_requests(&self) -> Vec<usize> {
        self.buffering_requests.lock().unwrap().clone()
    }

    pub fn read_times(&self) -> Vec<Duration> {
        self.read_times.lock().unwrap().clone()
    }
}

/// Backend serving fake devices at a fixed set of indices.
///
/// Devices default to 640x480 at 30 fps and clamp requests to at most 1920x1080 at 60 fps.
pub struct FakeBackend {
    state: Arc<FakeState>,
    available: Vec<u32>,
    fail_reads: Vec<usize>,
    read_cost: Duration,
    clock: Option<ManualClock>,
    buffering: bool,
}

impl FakeBackend {
    pub fn new(available: &[u32]) -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            available: available.to_vec(),
            fail_reads: Vec::new(),
            read_cost: Duration::from_secs(0),
            clock: None,
            buffering: false,
        }
    }

    /// Fail the reads with these (0-based, per device) numbers.
    pub fn fail_reads(mut self, reads: &[usize]) -> Self {
        self.fail_reads = reads.to_vec();
        self
    }

    /// Make every read take `cost` on `clock`.
    pub fn timed(mut self, clock: &ManualClock, cost: Duration) -> Self {
        self.clock = Some(clock.clone());
        self.read_cost = cost;
        self
    }

    pub fn supports_buffering(mut self) -> Self {
        self.buffering = true;
        self
    }

    pub fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }
}

impl DeviceBackend for FakeBackend {
    fn open(&self, index: u32, api: CaptureApi, hints: &OpenHints) -> Result<Box<dyn Device>> {
        if !self.available.contains(&index) {
            return Err(Error::DeviceUnavailable {
                index,
                backend: api.to_string(),
                reason: String::from("no such fake device"),
            });
        }

        let now_open = self.state.open_handles.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_concurrent.fetch_max(now_open, Ordering::SeqCst);
        self.state.opens.lock().unwrap().push(index);

        let negotiated = Negotiated {
            width: hints.width.map(|w| w.min(1920)).unwrap_or(640),
            height: hints.height.map(|h| h.min(1080)).unwrap_or(480),
            fps: hints.fps.map(|f| f.min(60.0)).unwrap_or(30.0),
        };

        Ok(Box::new(FakeDevice {
            state: Arc::clone(&self.state),
            negotiated,
            reads: 0,
            fail_reads: self.fail_reads.clone(),
            read_cost: self.read_cost,
            clock: self.clock.clone(),
            buffering: self.buffering,
        }))
    }
}

pub struct FakeDevice {
    state: Arc<FakeState>,
    negotiated: Negotiated,
    reads: usize,
    fail_reads: Vec<usize>,
    read_cost: Duration,
    clock: Option<ManualClock>,
    buffering: bool,
}

impl Device for FakeDevice {
    fn negotiated(&self) -> Negotiated {
        self.negotiated
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let n = self.reads;
        self.reads += 1;
        self.state.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(ref clock) = self.clock {
            self.state.read_times.lock().unwrap().push(clock.elapsed());
            clock.advance(self.read_cost);
        }

        if self.fail_reads.contains(&n) {
            return Err(Error::FrameReadError(String::from("fake device returned no frame")));
        }

        // Deliberately not the negotiated size, artifacts must report the session's properties
        let shade = (n % 256) as u8;
        Ok(Frame::new(RgbImage::from_pixel(16, 12, Rgb([shade, 128, 255 - shade]))))
    }

    fn minimize_buffering(&mut self) -> bool {
        self.state.buffering_requests.lock().unwrap().push(self.reads);
        self.buffering
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.state.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

// -----------------------------------------------------------------------------------------------
// HELPERS
// -----------------------------------------------------------------------------------------------

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A fresh, not yet existing directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "vision_camera_test_{}_{}_{}",
        name,
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

/// Build a session over `backend` driven by `clock`.
pub fn session_with(backend: FakeBackend, clock: &ManualClock) -> CameraSession {
    CameraSessionBuilder::new()
        .backend(backend)
        .clock(clock.clone())
        .build()
        .expect("Failed to build session")
}

/// Build a session and open device 0 at 1280x720.
pub fn open_session(backend: FakeBackend, clock: &ManualClock) -> CameraSession {
    let mut session = session_with(backend, clock);
    session
        .open(&OpenRequest::new(0).resolution(1280, 720))
        .expect("Failed to open fake camera");
    session
}
