//! # Tool Module
//!
//! Exposes the camera session as named tools taking JSON arguments and returning JSON results.
//! Failures are reported in the result with `"ok": false` rather than as errors, callers are
//! expected to check the flag.
//!
//! | Tool | Arguments |
//! |---|---|
//! | `list_cameras` | `max_index` |
//! | `vision_start` | `camera_index`, `width`, `height`, `fps`, `backend` |
//! | `vision_status` | |
//! | `vision_capture` | `save_dir`, `format` |
//! | `vision_burst` | `n`, `period_ms`, `save_dir`, `format`, `warmup`, `duration_ms` |
//! | `vision_stop` | |
//! | `list_images` | `directory`, `recursive` |
//!
//! Omitted arguments take their value from the [`VisionConfig`].

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::{self, BufRead, Write};

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::burst::BurstRequest;
use crate::config::{expand_home, VisionConfig};
use crate::error::{Error, Result};
use crate::files::list_images;
use crate::session::{CameraSession, OpenRequest};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Names of every tool understood by [`ToolServer::call`].
pub const TOOLS: &[&str] = &[
    "list_cameras",
    "vision_start",
    "vision_status",
    "vision_capture",
    "vision_burst",
    "vision_stop",
    "list_images",
];

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Dispatches tool calls onto a camera session.
pub struct ToolServer {
    session: CameraSession,

    config: VisionConfig,
}

/// One line of input to [`ToolServer::handle_line`].
#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Option<Value>,

    tool: String,

    #[serde(default)]
    args: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProbeArgs {
    max_index: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StartArgs {
    #[serde(alias = "index")]
    camera_index: Option<u32>,
    width: Option<i64>,
    height: Option<i64>,
    fps: Option<f64>,
    backend: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CaptureArgs {
    save_dir: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BurstArgs {
    n: Option<u32>,
    period_ms: Option<u64>,
    save_dir: Option<String>,
    format: Option<String>,
    warmup: Option<u32>,
    duration_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ImagesArgs {
    directory: Option<String>,
    recursive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NoArgs {}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl ToolServer {
    pub fn new(session: CameraSession, config: VisionConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CameraSession {
        &mut self.session
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Handle one JSON request line, `{"id"?: ..., "tool": "...", "args"?: {...}}`.
    ///
    /// Returns the JSON result, with the request's `id` echoed back when one was given.
    pub fn handle_line(&mut self, line: &str) -> String {
        let request: ToolRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => return failure(format!("Invalid request: {}", e)).to_string(),
        };

        let mut response = self.call(&request.tool, request.args);

        if let (Some(id), Value::Object(map)) = (request.id, &mut response) {
            map.insert(String::from("id"), id);
        }

        response.to_string()
    }

    /// Answer requests from `input` one line at a time until it is exhausted.
    ///
    /// Blank lines are skipped. A line which isn't valid UTF-8 gets a failure result and the
    /// next line is read as normal, only I/O errors end the loop.
    pub fn serve<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line),
                Err(e) => failure(format!("Invalid request: {}", e)).to_string(),
            };

            writeln!(output, "{}", response)?;
            output.flush()?;
        }
    }

    /// Invoke a tool by name.
    pub fn call(&mut self, tool: &str, args: Value) -> Value {
        debug!("Tool call {} {}", tool, args);

        let result = match tool {
            "list_cameras" => self.list_cameras(args),
            "vision_start" => self.vision_start(args),
            "vision_status" => parse_args::<NoArgs>(args).map(|_| self.vision_status()),
            "vision_capture" => self.vision_capture(args),
            "vision_burst" => self.vision_burst(args),
            "vision_stop" => parse_args::<NoArgs>(args).map(|_| self.vision_stop()),
            "list_images" => self.list_images(args),
            _ => Err(Error::InvalidArguments(format!(
                "unknown tool {:?}, expected one of {}",
                tool,
                TOOLS.join(", ")
            ))),
        };

        result.unwrap_or_else(|e| failure(e.to_string()))
    }

    fn list_cameras(&mut self, args: Value) -> Result<Value> {
        let args: ProbeArgs = parse_args(args)?;
        let max_index = args.max_index.unwrap_or(self.config.probe.max_index);

        Ok(to_json(&self.session.probe(max_index)))
    }

    fn vision_start(&mut self, args: Value) -> Result<Value> {
        let args: StartArgs = parse_args(args)?;
        let defaults = &self.config.camera;

        let request = OpenRequest::new(args.camera_index.unwrap_or(defaults.index))
            .resolution(
                args.width.unwrap_or(defaults.width),
                args.height.unwrap_or(defaults.height),
            )
            .fps(args.fps.unwrap_or(defaults.fps))
            .backend(args.backend.unwrap_or_else(|| defaults.backend.clone()));

        Ok(match self.session.open(&request) {
            Ok(outcome) => success(&outcome),
            Err(e) => {
                let status = self.session.status();
                json!({
                    "ok": false,
                    "message": e.to_string(),
                    "props": status.props,
                    "index": status.index,
                })
            }
        })
    }

    fn vision_status(&mut self) -> Value {
        to_json(&self.session.status())
    }

    fn vision_capture(&mut self, args: Value) -> Result<Value> {
        let args: CaptureArgs = parse_args(args)?;
        let defaults = &self.config.capture;

        let save_dir = expand_home(args.save_dir.as_ref().unwrap_or(&defaults.save_dir));
        let format = args.format.unwrap_or_else(|| defaults.format.clone());

        Ok(match self.session.capture(&save_dir, &format) {
            Ok(artifact) => success(&artifact),
            Err(e) => failure(e.to_string()),
        })
    }

    fn vision_burst(&mut self, args: Value) -> Result<Value> {
        let args: BurstArgs = parse_args(args)?;
        let defaults = &self.config.burst;

        let request = BurstRequest::new(expand_home(
            args.save_dir.as_ref().unwrap_or(&defaults.save_dir),
        ))
        .count(args.n.unwrap_or(defaults.n))
        .period_ms(args.period_ms.unwrap_or(defaults.period_ms))
        .duration_ms(args.duration_ms.unwrap_or(defaults.duration_ms))
        .warmup(args.warmup.unwrap_or(defaults.warmup))
        .format(args.format.unwrap_or_else(|| defaults.format.clone()));

        Ok(match self.session.burst(&request) {
            Ok(report) => success(&report),
            Err(e) => {
                let paths: Vec<String> = e
                    .saved_paths()
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();

                json!({
                    "ok": false,
                    "error": e.to_string(),
                    "paths": paths,
                })
            }
        })
    }

    fn vision_stop(&mut self) -> Value {
        self.session.stop();

        json!({ "ok": true })
    }

    fn list_images(&mut self, args: Value) -> Result<Value> {
        let args: ImagesArgs = parse_args(args)?;
        let defaults = &self.config.images;

        let directory = expand_home(args.directory.as_ref().unwrap_or(&defaults.directory));
        let recursive = args.recursive.unwrap_or(defaults.recursive);

        Ok(match list_images(&directory, recursive) {
            Ok(listing) => success(&listing),
            Err(e) => failure(e.to_string()),
        })
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Deserialise tool arguments, a missing (`null`) argument object means all defaults.
fn parse_args<T: DeserializeOwned + Default>(args: Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(args).map_err(|e| Error::InvalidArguments(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| failure(e.to_string()))
}

/// Serialise a result object and mark it `"ok": true`.
fn success<T: Serialize>(value: &T) -> Value {
    match to_json(value) {
        Value::Object(mut map) => {
            map.insert(String::from("ok"), Value::Bool(true));
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert(String::from("ok"), Value::Bool(true));
            map.insert(String::from("result"), other);
            Value::Object(map)
        }
    }
}

fn failure(error: String) -> Value {
    json!({ "ok": false, "error": error })
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
