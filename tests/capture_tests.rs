use frametrace::capture::format::{CAPTURE_MAGIC, CAPTURE_MAGIC_SWAPPED, LEGACY_MAGIC};
use frametrace::capture::{open_capture_session, CaptureFrame, CaptureReader, CaptureWriter};
use frametrace::metadata::{GroupEntry, MetadataSnapshot, StatEntry, ThreadEntry};
use frametrace::reconstruct::{CycleGraph, FrameDataMessage, RawStatMessage, StatRef};
use frametrace::session::{SessionKind, SessionState};
use frametrace::store::SampleKind;
use frametrace::utils::config::EngineConfig;
use frametrace::utils::error::CaptureError;
use pretty_assertions::assert_eq;

const GAME: u32 = 100;
const TICK: u32 = 10;

fn snapshot() -> MetadataSnapshot {
    MetadataSnapshot {
        seconds_per_cycle: 1e-3,
        groups: vec![GroupEntry {
            id: 3,
            name: "STATGROUP_Engine".into(),
        }],
        stats: vec![StatEntry {
            id: TICK,
            group_id: Some(3),
            name: "STAT_Tick".into(),
            description: None,
            kind: SampleKind::HierarchicalTime,
        }],
        threads: vec![ThreadEntry {
            thread_id: GAME,
            name: "GameThread".into(),
            stat_id: None,
        }],
    }
}

fn frame(number: i64, tick_cycles: u64) -> FrameDataMessage {
    let mut message = FrameDataMessage {
        frame: number,
        ..FrameDataMessage::default()
    };
    message.cycle_graphs.insert(
        GAME,
        CycleGraph::new(GAME, 0, 0).with_child(CycleGraph::new(GAME, TICK, tick_cycles)),
    );
    message
}

fn cycle_graph_capture(compressed: bool) -> Vec<u8> {
    let mut writer = CaptureWriter::new("Windows", false).with_compression(compressed);
    writer.set_metadata(snapshot());
    for (n, cycles) in [(0, 10), (1, 20), (2, 30)] {
        writer.add_frame(&frame(n, cycles)).unwrap();
    }
    writer.to_bytes().unwrap()
}

#[test]
fn test_cycle_graph_capture_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("session.ftrace");
    std::fs::write(&path, cycle_graph_capture(true)).unwrap();

    let mut session = match open_capture_session(&path, EngineConfig::default()) {
        Ok(session) => session,
        Err(err) => panic!("capture failed to open: {}", err),
    };
    assert_eq!(session.kind(), SessionKind::CaptureFile);
    assert_eq!(session.queued_frames(), 3);
    assert_eq!(session.state().state(), SessionState::Capturing);

    session.drain();
    assert!(session.is_completed());
    assert_eq!(session.store().num_frames(), 3);
    assert_eq!(session.stats().get(TICK).unwrap().avg(), 20.0);
    assert_eq!(session.registry().stat(TICK).name, "Tick");
    assert_eq!(session.average_event_graph().unwrap().find("Tick").unwrap().inclusive_ms, 20.0);
}

#[test]
fn test_uncompressed_capture_decodes_the_same_frames() {
    let compressed = CaptureReader::from_bytes(&cycle_graph_capture(true)).unwrap();
    let plain = CaptureReader::from_bytes(&cycle_graph_capture(false)).unwrap();

    assert!(compressed.header().compressed);
    assert!(!plain.header().compressed);
    assert_eq!(compressed.frames(), plain.frames());
    assert_eq!(plain.metadata(), &snapshot());
    assert_eq!(plain.header().platform, "Windows");
}

#[test]
fn test_raw_capture_round_trip() {
    let mut writer = CaptureWriter::new("Linux", true);
    writer.set_metadata(snapshot());
    let tick = |cycles| RawStatMessage::scope_start(GAME, StatRef::Name("STAT_Physics".into()), cycles);
    writer
        .add_raw_frame(5, &[tick(0), RawStatMessage::scope_end(GAME, 4)])
        .unwrap();
    writer
        .add_raw_frame(6, &[tick(10), RawStatMessage::scope_end(GAME, 16)])
        .unwrap();
    assert!(matches!(
        writer.add_frame(&frame(0, 10)),
        Err(CaptureError::MismatchedPayload { .. })
    ));

    let capture = CaptureReader::from_bytes(&writer.to_bytes().unwrap()).unwrap();
    assert!(capture.header().raw);
    assert_eq!(capture.strings().to_vec(), vec!["STAT_Physics".to_string()]);
    assert!(matches!(
        &capture.frames()[1],
        CaptureFrame::Raw { source_frame: 6, messages } if messages.len() == 2
    ));

    let mut session = frametrace::capture::session_from_capture(capture, EngineConfig::default());
    assert_eq!(session.kind(), SessionKind::RawCaptureFile);
    session.drain();
    assert_eq!(session.store().num_frames(), 2);
    assert_eq!(session.store().total_elapsed_ms(), 10.0);
    assert!(session.registry().stat_by_name("Physics").is_some());
}

#[test]
fn test_unrecognized_magic_creates_no_session() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bad.ftrace");
    let mut bytes = cycle_graph_capture(true);
    bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let result = open_capture_session(&path, EngineConfig::default());
    assert!(matches!(result, Err(CaptureError::BadMagic(0xDEAD_BEEF))));
}

#[test]
fn test_recognized_but_unsupported_magic() {
    let mut bytes = cycle_graph_capture(true);
    bytes[..4].copy_from_slice(&CAPTURE_MAGIC.to_be_bytes());
    assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), CAPTURE_MAGIC_SWAPPED);
    assert!(matches!(
        CaptureReader::from_bytes(&bytes),
        Err(CaptureError::ByteSwapped)
    ));

    bytes[..4].copy_from_slice(&LEGACY_MAGIC.to_le_bytes());
    assert!(matches!(
        CaptureReader::from_bytes(&bytes),
        Err(CaptureError::LegacyFormat)
    ));
}

#[test]
fn test_truncated_and_damaged_captures() {
    let bytes = cycle_graph_capture(true);
    assert!(CaptureReader::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    assert!(matches!(
        CaptureReader::from_bytes(&bytes[..6]),
        Err(CaptureError::Truncated(_))
    ));

    let string_table = CaptureReader::from_bytes(&bytes)
        .unwrap()
        .header()
        .string_table_offset as usize;
    let mut damaged = bytes.clone();
    damaged[string_table - 4] ^= 0xFF;
    assert!(matches!(
        CaptureReader::from_bytes(&damaged),
        Err(CaptureError::MissingEndMarker)
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = open_capture_session(temp_dir.path().join("none.ftrace"), EngineConfig::default());
    assert!(matches!(result, Err(CaptureError::Io(_))));
}

#[test]
fn test_oversized_table_counts_are_format_errors() {
    let bytes = cycle_graph_capture(false);
    let header = CaptureReader::from_bytes(&bytes).unwrap().header().clone();

    for offset in [header.frame_table_offset, header.string_table_offset] {
        let mut damaged = bytes.clone();
        let offset = offset as usize;
        damaged[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            CaptureReader::from_bytes(&damaged),
            Err(CaptureError::Truncated(_))
        ));
    }

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("damaged.ftrace");
    let mut damaged = bytes;
    let offset = header.frame_table_offset as usize;
    damaged[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    std::fs::write(&path, &damaged).unwrap();
    assert!(open_capture_session(&path, EngineConfig::default()).is_err());
}

#[test]
fn test_implausible_decompressed_size_is_rejected() {
    let bytes = cycle_graph_capture(true);
    let capture = CaptureReader::from_bytes(&bytes).unwrap();
    let frame_table = capture.header().frame_table_offset as usize;

    // First frame-table entry: i64 target frame, then u64 payload offset.
    let entry = frame_table + 4;
    let mut offset = [0u8; 8];
    offset.copy_from_slice(&bytes[entry + 8..entry + 16]);
    let payload = u64::from_le_bytes(offset) as usize;

    // Skip the u32 payload length to reach the LZ4 size prefix.
    let mut damaged = bytes;
    damaged[payload + 4..payload + 8].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        CaptureReader::from_bytes(&damaged),
        Err(CaptureError::Decompress(_))
    ));
}
