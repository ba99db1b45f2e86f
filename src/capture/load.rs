//! Creating a file-backed session from a capture.

use super::reader::{CaptureFrame, CaptureReader};
use crate::session::{ProfilerSession, SessionKind};
use crate::utils::config::EngineConfig;
use crate::utils::error::CaptureError;
use log::{info, warn};
use std::path::Path;

/// Open a capture and queue all of its frames on a new session
///
/// **Public** - main entry point for offline analysis
///
/// The capture is fully validated first; on error no session exists. The
/// returned session is capturing with every frame queued and all data marked
/// as received, so ticking it until completion processes the whole file.
///
/// # Errors
/// Any `CaptureError` from `CaptureReader::open`
///
/// # Example
/// ```ignore
/// let mut session = open_capture_session("session.ftrace", EngineConfig::default())?;
/// session.drain();
/// ```
pub fn open_capture_session(
    path: impl AsRef<Path>,
    config: EngineConfig,
) -> Result<ProfilerSession, CaptureError> {
    let reader = CaptureReader::open(path)?;
    Ok(session_from_capture(reader, config))
}

/// Build a session from an already decoded capture
pub fn session_from_capture(reader: CaptureReader, config: EngineConfig) -> ProfilerSession {
    let (header, metadata, frames) = reader.into_parts();
    let kind = if header.raw {
        SessionKind::RawCaptureFile
    } else {
        SessionKind::CaptureFile
    };

    let mut session = ProfilerSession::new(kind, config);
    session.update_metadata(&metadata);
    if let Err(err) = session.start_capture() {
        warn!("Could not start capture on new session: {}", err);
    }

    let num_frames = frames.len();
    for frame in frames {
        match frame {
            CaptureFrame::Data(message) => session.enqueue_frame(message),
            CaptureFrame::Raw {
                source_frame,
                messages,
            } => session.enqueue_raw_frame(source_frame, messages),
        }
    }
    session.mark_all_data_received();

    info!(
        "Queued {} frames from {} capture on session {}",
        num_frames,
        header.platform,
        session.id()
    );
    session
}
