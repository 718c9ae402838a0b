//! # Vision camera tool server
//!
//! Reads one JSON tool call per line from stdin and writes one JSON result per line to stdout.
//! Logs go to stderr.
//!
//! ```text
//! {"id": 1, "tool": "vision_start", "args": {"camera_index": 0}}
//! {"id": 2, "tool": "vision_burst", "args": {"duration_ms": 1000, "period_ms": 200}}
//! {"id": 3, "tool": "vision_stop"}
//! ```

use std::io;
use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};

use vision_camera::{logging, CameraSessionBuilder, ToolServer, VisionConfig};

// -----------------------------------------------------------------------------------------------
// ARGUMENTS
// -----------------------------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "vision-camera", version, about = "Camera tools over stdin/stdout")]
struct Args {
    /// Configuration file with tool defaults (toml, json, yaml, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// One of off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

// -----------------------------------------------------------------------------------------------
// MAIN
// -----------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(LevelFilter::Info);
    logging::init(level);

    let config = match args.config {
        Some(ref path) => VisionConfig::from_file(path)?,
        None => VisionConfig::default(),
    };

    let session = CameraSessionBuilder::new().config(&config).build()?;
    let mut server = ToolServer::new(session, config);

    info!("vision-camera ready, reading tool calls from stdin");

    let stdin = io::stdin();
    let stdout = io::stdout();
    server.serve(stdin.lock(), stdout.lock())?;

    server.session_mut().stop();
    info!("stdin closed, camera released");

    Ok(())
}
