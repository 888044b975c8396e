//! Gesture steering application: calibrate against a detection trace and drive.

use anyhow::{bail, Context, Result};
use clap::Parser;
use lean_drive::{
    config::{Config, EXAMPLE_CONFIG},
    detection::ReplaySource,
    presenter::LogPresenter,
    session::{AutoPrompt, ClockMode, LinePrompt, OperatorPrompt, Session, StopReason},
};
use log::{info, warn};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded detection trace to replay (YAML)
    #[arg(short, long)]
    trace: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Wait for Enter before each calibration sample
    #[arg(short, long)]
    interactive: bool,

    /// Treat the video feed as not mirrored
    #[arg(long)]
    no_mirror: bool,

    /// Fixed simulation rate (overrides the config file)
    #[arg(long)]
    fps: Option<u32>,

    /// Use the measured wall-clock rate instead of a fixed rate
    #[arg(long)]
    measured_fps: bool,

    /// Sleep the configured poll interval between frames
    #[arg(long)]
    realtime: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Lean Drive - gesture steering simulator");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if args.no_mirror {
        config.calibration.mirror = false;
    }
    if let Some(fps) = args.fps {
        config.session.target_fps = fps;
    }
    if args.max_frames.is_some() {
        config.session.max_frames = args.max_frames;
    }
    config.validate().context("Invalid configuration")?;

    let Some(trace_path) = args.trace else {
        bail!("No detection trace given; pass --trace <FILE>");
    };
    let mut source = ReplaySource::from_file(&trace_path, config.detection.min_confidence)
        .with_context(|| format!("Failed to open trace {trace_path}"))?;

    let mut session = Session::new(&config);
    if args.measured_fps {
        session = session.with_clock(ClockMode::Measured);
    }
    if args.realtime {
        session = session.with_pacing(Duration::from_millis(config.detection.poll_interval_ms));
    }

    let mut prompt: Box<dyn OperatorPrompt> = if args.interactive {
        Box::new(LinePrompt::new(std::io::stdin().lock(), std::io::stdout()))
    } else {
        Box::new(AutoPrompt)
    };
    session
        .calibrate(&mut source, prompt.as_mut())
        .context("Calibration failed")?;

    let summary = session.run(&mut source, &mut LogPresenter)?;

    let body = session.vehicle().body_pose();
    info!(
        "Final pose: ({:.2}, {:.2}) heading {:.3} rad, {} steering snaps",
        body.position.x, body.position.y, body.heading, summary.steering_snaps
    );

    if let StopReason::DetectorFailed(reason) = summary.stop_reason {
        bail!("Detection loop stopped: {reason}");
    }

    Ok(())
}
