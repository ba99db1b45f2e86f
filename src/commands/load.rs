//! Load command implementation.
//!
//! The load command:
//! 1. Loads engine configuration
//! 2. Opens and validates the capture file
//! 3. Processes every queued frame
//! 4. Builds the session report
//! 5. Writes output files

use crate::capture::open_capture_session;
use crate::event_graph::EventGraphKind;
use crate::output::{build_report, generate_text_summary, write_report, ReportOptions};
use crate::session::SessionEvent;
use crate::utils::config::{load_config, EngineConfig};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the load command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct LoadArgs {
    /// Capture file to process
    pub capture_file: PathBuf,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Optional engine configuration (TOML)
    pub config_file: Option<PathBuf>,

    /// Which event graph goes into the report
    pub graph_kind: EventGraphKind,

    /// Inclusive frame range for the event graph
    pub frame_range: Option<(usize, usize)>,

    /// Number of stats listed in the report
    pub top_stats: usize,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            capture_file: PathBuf::new(),
            output_json: PathBuf::from("report.json"),
            config_file: None,
            graph_kind: EventGraphKind::Average,
            frame_range: None,
            top_stats: 50,
            print_summary: false,
        }
    }
}

/// Execute the load command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Config read or validation failures
/// * Capture open/validation failures (no session is created)
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = LoadArgs {
///     capture_file: PathBuf::from("session.ftrace"),
///     print_summary: true,
///     ..Default::default()
/// };
///
/// execute_load(args)?;
/// ```
pub fn execute_load(args: LoadArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Loading capture: {}", args.capture_file.display());

    info!("Step 1/5: Loading configuration...");
    let config = match &args.config_file {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!("Engine config: {:?}", config);

    info!("Step 2/5: Opening capture file...");
    let hot_path_threshold_pct = config.hot_path_threshold_pct;
    let mut session = open_capture_session(&args.capture_file, config)
        .context("Failed to open capture file")?;
    let events = session.take_event_receiver();

    info!("Step 3/5: Processing {} frames...", session.queued_frames());
    let ticks = session.drain();
    debug!("Processed in {} ticks", ticks);

    if let Some(events) = events {
        for event in events.try_iter() {
            match event {
                SessionEvent::FrameDropped {
                    source_frame,
                    error,
                    ..
                } => warn!("Dropped frame {}: {}", source_frame, error),
                SessionEvent::CaptureProcessed {
                    frames, dropped, ..
                } => info!("Capture processed: {} frames, {} dropped", frames, dropped),
                other => debug!("Session event: {:?}", other),
            }
        }
    }

    info!("Step 4/5: Building report...");
    if let Some(range) = args.frame_range {
        validate_frame_range(range, session.store().num_frames())?;
    }
    let options = ReportOptions {
        graph_kind: args.graph_kind,
        frame_range: args.frame_range,
        hot_path_threshold_pct,
        top_stats: args.top_stats,
    };
    let report = build_report(&mut session, &options);

    info!("Step 5/5: Writing output files...");
    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("SESSION SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Capture:  {}", args.capture_file.display());
        println!("Session:  {}", report.session_id);
        println!("Kind:     {:?}", report.kind);
        println!("\n{}", generate_text_summary(&report, 10));
        println!("{}", "=".repeat(80));
    }

    info!("Load completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Validate load arguments
///
/// **Public** - can be called before execute_load for early validation
pub fn validate_args(args: &LoadArgs) -> Result<()> {
    if args.capture_file.as_os_str().is_empty() {
        anyhow::bail!("Capture file path cannot be empty");
    }

    if let Some((first, last)) = args.frame_range {
        if first > last {
            anyhow::bail!("Frame range start ({}) is after its end ({})", first, last);
        }
    }

    if args.top_stats == 0 {
        anyhow::bail!("top_stats must be greater than 0");
    }

    Ok(())
}

/// Check a requested frame range against the frames actually loaded
///
/// **Public** - the frame count is only known once the capture is processed
pub fn validate_frame_range((first, last): (usize, usize), frames: usize) -> Result<()> {
    if last >= frames {
        anyhow::bail!(
            "Frame range {}..={} is outside the capture ({} frames loaded)",
            first,
            last,
            frames
        );
    }
    Ok(())
}
