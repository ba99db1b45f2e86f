//! Info and version commands.

use crate::capture::{CaptureFrame, CaptureReader};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Print what a capture file holds without processing it
pub fn display_capture_info(file_path: &Path) -> Result<()> {
    println!("Reading capture: {}", file_path.display());

    let capture = CaptureReader::open(file_path)
        .with_context(|| format!("Invalid capture file {}", file_path.display()))?;
    let header = capture.header();

    let messages: usize = capture
        .frames()
        .iter()
        .map(|frame| match frame {
            CaptureFrame::Data(message) => message.cycle_graphs.len(),
            CaptureFrame::Raw { messages, .. } => messages.len(),
        })
        .sum();

    println!("✓ Valid capture");
    println!("  Version: {}", header.version);
    println!("  Platform: {}", header.platform);
    println!("  Compressed: {}", header.compressed);
    println!(
        "  Payload: {}",
        if header.raw { "raw stat messages" } else { "cycle graphs" }
    );
    println!("  Frames: {}", capture.num_frames());
    println!(
        "  {}: {}",
        if header.raw { "Messages" } else { "Thread graphs" },
        messages
    );
    println!("  Strings: {}", capture.strings().len());
    println!(
        "  Metadata: {} groups, {} stats, {} threads",
        capture.metadata().groups.len(),
        capture.metadata().stats.len(),
        capture.metadata().threads.len()
    );

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("frametrace v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Frame profiling capture analysis.");
}
