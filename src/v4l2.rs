//! # V4L2 Device Backend
//!
//! Opens `/dev/video{index}` through [`rscam`](https://github.com/loyd/rscam). Requested
//! properties are matched against what the device advertises and the nearest supported values
//! are handed to the driver, those are then reported as the negotiated properties.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{DynamicImage, ImageFormat, RgbImage};
use rscam::{Camera, Config, IntervalInfo, ResolutionInfo};

use crate::backend::CaptureApi;
use crate::device::{Device, DeviceBackend, Frame, Negotiated, OpenHints};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Pixel formats we can decode, in order of preference.
const FORMATS: &[&[u8; 4]] = &[b"MJPG", b"YUYV"];

/// Resolution used when none is requested and the device offers it.
const DEFAULT_RESOLUTION: (u32, u32) = (640, 480);

/// Number of driver buffers.
const NUM_BUFFERS: u32 = 2;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// Backend opening V4L2 devices.
#[derive(Debug, Clone, Default)]
pub struct V4l2Backend {}

/// An open, streaming V4L2 device.
pub struct V4l2Device {
    camera: Camera,

    format: [u8; 4],

    negotiated: Negotiated,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl V4l2Backend {
    pub fn new() -> Self {
        Self {}
    }
}

impl DeviceBackend for V4l2Backend {
    fn open(&self, index: u32, api: CaptureApi, hints: &OpenHints) -> Result<Box<dyn Device>> {
        let unavailable = |reason: String| Error::DeviceUnavailable {
            index,
            backend: api.to_string(),
            reason,
        };

        match api {
            CaptureApi::Any | CaptureApi::V4l2 => (),
            _ => return Err(unavailable(String::from("backend not available on this platform"))),
        }

        let path = format!("/dev/video{}", index);
        let mut camera = Camera::new(&path).map_err(|e| unavailable(e.to_string()))?;

        let format = pick_format(&camera).ok_or_else(|| {
            unavailable(String::from("device offers neither MJPG nor YUYV"))
        })?;

        let resolution = camera
            .resolutions(&format)
            .map(|info| pick_resolution(&info, hints))
            .map_err(|e| unavailable(e.to_string()))?;

        let interval = camera
            .intervals(&format, resolution)
            .map(|info| pick_interval(&info, hints.fps))
            .map_err(|e| unavailable(e.to_string()))?;

        camera
            .start(&Config {
                interval,
                resolution,
                format: &format,
                nbuffers: NUM_BUFFERS,
                ..Default::default()
            })
            .map_err(|e| unavailable(format!("{:?}", e)))?;

        let negotiated = Negotiated {
            width: resolution.0,
            height: resolution.1,
            fps: interval_to_fps(interval),
        };

        Ok(Box::new(V4l2Device {
            camera,
            format,
            negotiated,
        }))
    }
}

impl Device for V4l2Device {
    fn negotiated(&self) -> Negotiated {
        self.negotiated
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let rscam_frame = self
            .camera
            .capture()
            .map_err(|e| Error::FrameReadError(e.to_string()))?;

        let (width, height) = rscam_frame.resolution;

        let image = match &self.format {
            b"MJPG" => image::load_from_memory_with_format(&rscam_frame, ImageFormat::Jpeg)
                .map(DynamicImage::into_rgb8)
                .map_err(Error::ImageConversionError)?,
            _ => yuyv_to_rgb(&rscam_frame, width, height)?,
        };

        Ok(Frame::new(image))
    }
}

impl Drop for V4l2Device {
    fn drop(&mut self) {
        // Closing the file descriptor releases the device, stopping first is only a courtesy
        let _ = self.camera.stop();
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn pick_format(camera: &Camera) -> Option<[u8; 4]> {
    let offered: Vec<[u8; 4]> = camera
        .formats()
        .filter_map(|f| f.ok())
        .map(|f| f.format)
        .collect();

    FORMATS
        .iter()
        .find(|f| offered.contains(**f))
        .map(|f| **f)
}

fn pick_resolution(info: &ResolutionInfo, hints: &OpenHints) -> (u32, u32) {
    match info {
        ResolutionInfo::Discretes(sizes) => {
            let target = match (hints.width, hints.height) {
                (None, None) => {
                    if sizes.contains(&DEFAULT_RESOLUTION) || sizes.is_empty() {
                        return DEFAULT_RESOLUTION;
                    }
                    return sizes[0];
                }
                (w, h) => (
                    w.unwrap_or(DEFAULT_RESOLUTION.0),
                    h.unwrap_or(DEFAULT_RESOLUTION.1),
                ),
            };

            sizes
                .iter()
                .copied()
                .min_by_key(|&(w, h)| {
                    let dw = i64::from(w) - i64::from(target.0);
                    let dh = i64::from(h) - i64::from(target.1);
                    dw * dw + dh * dh
                })
                .unwrap_or(DEFAULT_RESOLUTION)
        }
        ResolutionInfo::Stepwise { min, max, step } => {
            let w = hints.width.unwrap_or(DEFAULT_RESOLUTION.0);
            let h = hints.height.unwrap_or(DEFAULT_RESOLUTION.1);

            (
                snap(w, min.0, max.0, step.0),
                snap(h, min.1, max.1, step.1),
            )
        }
    }
}

fn pick_interval(info: &IntervalInfo, fps: Option<f64>) -> (u32, u32) {
    match info {
        IntervalInfo::Discretes(intervals) => {
            let first = intervals.first().copied().unwrap_or((1, 30));

            match fps {
                Some(fps) => intervals
                    .iter()
                    .copied()
                    .min_by(|a, b| {
                        let da = (interval_to_fps(*a) - fps).abs();
                        let db = (interval_to_fps(*b) - fps).abs();
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(first),
                None => first,
            }
        }
        IntervalInfo::Stepwise { min, max, .. } => {
            // Stepwise intervals are rare, only the endpoints are considered
            let fastest = *min;
            let slowest = *max;

            match fps {
                Some(fps) if (interval_to_fps(slowest) - fps).abs()
                    < (interval_to_fps(fastest) - fps).abs() =>
                {
                    slowest
                }
                _ => fastest,
            }
        }
    }
}

fn interval_to_fps((num, den): (u32, u32)) -> f64 {
    if num == 0 {
        0.0
    } else {
        f64::from(den) / f64::from(num)
    }
}

/// Clamp `value` into `[min, max]` on the grid `min + k * step`.
fn snap(value: u32, min: u32, max: u32, step: u32) -> u32 {
    let clamped = value.max(min).min(max);

    if step == 0 {
        return clamped;
    }

    min + ((clamped - min) / step) * step
}

/// Convert a packed YUYV (YUV 4:2:2) buffer into an RGB image.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected {
        return Err(Error::FrameReadError(format!(
            "short YUYV frame: {} of {} bytes",
            data.len(),
            expected
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::FrameReadError(String::from("YUYV buffer size mismatch")))
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = f32::from(y) - 16.0;
    let d = f32::from(u) - 128.0;
    let e = f32::from(v) - 128.0;

    let clamp = |x: f32| x.round().max(0.0).min(255.0) as u8;

    [
        clamp(1.164 * c + 1.596 * e),
        clamp(1.164 * c - 0.392 * d - 0.813 * e),
        clamp(1.164 * c + 2.017 * d),
    ]
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
