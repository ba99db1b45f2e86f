//! Frame index: sample ranges, durations and elapsed time per sealed frame.
//!
//! Elapsed times are cumulative and therefore monotonic, which is what makes
//! the time-to-frame lookups plain binary searches.

use serde::{Deserialize, Serialize};
use std::ops::Range;

const MS_PER_SECOND: f64 = 1000.0;

/// One sealed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// First sample of the frame
    pub start_index: usize,
    /// One past the last sample of the frame
    pub end_index: usize,
    pub duration_ms: f64,
    /// Capture time at the end of this frame
    pub elapsed_ms: f64,
}

impl FrameRecord {
    pub fn sample_range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Capture time at the start of this frame
    pub fn start_ms(&self) -> f64 {
        self.elapsed_ms - self.duration_ms
    }
}

/// Frames that completed during one wall-clock second of the capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondBucket {
    pub second: usize,
    pub frame_count: u32,
    /// Frames sealed so far when the bucket was closed
    pub total_frames: usize,
    /// Capture time when the bucket was closed
    pub elapsed_ms: f64,
}

/// Ordered frame records plus per-second frame counts
#[derive(Debug, Clone, Default)]
pub struct FrameIndex {
    records: Vec<FrameRecord>,
    seconds: Vec<SecondBucket>,
    open_second_frames: u32,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&FrameRecord> {
        self.records.get(frame)
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// Closed one-second buckets, oldest first
    pub fn seconds(&self) -> &[SecondBucket] {
        &self.seconds
    }

    /// Frames counted in the second that is still open
    pub fn open_second_frames(&self) -> u32 {
        self.open_second_frames
    }

    pub fn total_elapsed_ms(&self) -> f64 {
        self.records.last().map_or(0.0, |r| r.elapsed_ms)
    }

    /// Record a sealed frame
    ///
    /// **Public** - called by `SampleStore::advance_frame`
    ///
    /// # Returns
    /// Index of the new frame
    pub fn push(&mut self, start_index: usize, end_index: usize, duration_ms: f64) -> usize {
        debug_assert!(self
            .records
            .last()
            .map_or(true, |last| last.end_index == start_index));

        let elapsed_ms = self.total_elapsed_ms() + duration_ms;
        self.records.push(FrameRecord {
            start_index,
            end_index,
            duration_ms,
            elapsed_ms,
        });

        self.open_second_frames += 1;
        // A long frame can cross several second boundaries at once.
        while elapsed_ms >= (self.seconds.len() + 1) as f64 * MS_PER_SECOND {
            self.seconds.push(SecondBucket {
                second: self.seconds.len(),
                frame_count: self.open_second_frames,
                total_frames: self.records.len(),
                elapsed_ms,
            });
            self.open_second_frames = 0;
        }

        self.records.len() - 1
    }

    /// Frame whose time span contains `time_ms`
    ///
    /// Times before the first frame resolve to frame 0, times at the very end
    /// to the last frame. Returns None when empty or when `time_ms` lies
    /// outside the capture.
    pub fn frame_at_time(&self, time_ms: f64) -> Option<usize> {
        if self.records.is_empty() || time_ms < 0.0 || time_ms > self.total_elapsed_ms() {
            return None;
        }
        let frame = self.records.partition_point(|r| r.elapsed_ms <= time_ms);
        Some(frame.min(self.records.len() - 1))
    }

    /// Inclusive frame range covering `[start_ms, end_ms]`
    ///
    /// The range brackets the requested span even when both times fall
    /// strictly between frame boundaries. An end past the capture is clamped
    /// to the last frame.
    pub fn frames_overlapping_time(&self, start_ms: f64, end_ms: f64) -> Option<(usize, usize)> {
        if start_ms > end_ms {
            return None;
        }
        let first = self.frame_at_time(start_ms)?;
        let last = self
            .records
            .partition_point(|r| r.elapsed_ms < end_ms)
            .min(self.records.len() - 1)
            .max(first);
        Some((first, last))
    }
}
