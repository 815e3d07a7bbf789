//! Wall-clock paced video player
//!
//! Opens a media file with FFmpeg, converts each decoded frame to RGB on the GPU and
//! presents it when its timestamp comes due.
//!
//! # Usage
//! ```bash
//! cargo run --example player --features ffmpeg -- video.mp4 [--paused] [--slots 5] [--tick-ms 16]
//! ```

/// Window and keyboard handling
mod app;

/// Session bring-up, ticking and redraws for one window
mod player;

use crate::app::VideoPlayerApp;
use clap::Parser;
use playback_wgpu::{PlayerConfig, pool::DEFAULT_SLOT_COUNT};
use std::{path::PathBuf, time::Duration};
use winit::event_loop::{ControlFlow, EventLoop};

/// Command-line arguments for the video player
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the media file to play
    filename: PathBuf,

    /// Number of frame slots buffered on the GPU
    #[arg(long, default_value_t = DEFAULT_SLOT_COUNT)]
    slots: usize,

    /// Decode tick interval in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Start the video player in paused state
    #[arg(long, short)]
    paused: bool,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt().with_max_level(args.log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = PlayerConfig {
        slot_count: args.slots,
        tick_interval: Duration::from_millis(args.tick_ms),
        start_paused: args.paused,
    };
    config.validate()?;

    tracing::info!("Starting video player...");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = VideoPlayerApp::new(args.filename, config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
