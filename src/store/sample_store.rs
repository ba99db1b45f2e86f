//! Append-only sample arena with its frame index.
//!
//! Samples are written for the frame currently being built ("pending") and
//! become immutable once `advance_frame` seals that frame. A pending frame that
//! fails reconstruction can be discarded; sealed indices are never reused.

use super::frame_index::{FrameIndex, FrameRecord};
use super::sample::{Sample, SampleIndex, SampleKind, INVALID_SAMPLE};
use crate::utils::error::StructuralError;
use log::debug;
use std::ops::Range;

/// Storage for one capture session
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
    frames: FrameIndex,
    /// First sample of the pending frame
    pending_start: usize,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hierarchical sample
    ///
    /// **Public** - main entry point for timed scopes
    ///
    /// When `parent` is given, the new index is appended to the parent's
    /// children. The parent must belong to the pending frame.
    ///
    /// # Errors
    /// * `StructuralError::InvalidSampleIndex` - parent does not exist
    /// * `StructuralError::SealedSample` - parent belongs to a sealed frame
    #[allow(clippy::too_many_arguments)]
    pub fn add_hierarchical_sample(
        &mut self,
        thread_id: u32,
        group_id: u32,
        stat_id: u32,
        start_ms: f64,
        duration_ms: f64,
        calls_per_frame: u32,
        parent: Option<SampleIndex>,
    ) -> Result<SampleIndex, StructuralError> {
        if let Some(parent) = parent {
            self.check_pending(parent)?;
        }

        let index = self.samples.len();
        self.samples.push(Sample::hierarchical(
            thread_id,
            group_id,
            stat_id,
            start_ms,
            duration_ms,
            calls_per_frame,
            parent,
        ));
        if let Some(parent) = parent {
            self.samples[parent].children.push(index);
        }
        Ok(index)
    }

    /// Append a flat counter sample (no parent, no children)
    pub fn add_counter_sample(
        &mut self,
        group_id: u32,
        stat_id: u32,
        value: f64,
        kind: SampleKind,
    ) -> SampleIndex {
        let index = self.samples.len();
        self.samples.push(Sample::counter(group_id, stat_id, value, kind));
        index
    }

    /// Patch the duration of a pending sample once its closing event arrives
    ///
    /// # Errors
    /// * `StructuralError::SealedSample` - sample belongs to a sealed frame
    /// * `StructuralError::AlreadyPatched` - sample was patched before
    pub fn set_duration(&mut self, index: SampleIndex, duration_ms: f64) -> Result<(), StructuralError> {
        let sample = self.patchable(index)?;
        sample.duration_ms = duration_ms;
        sample.patched = true;
        Ok(())
    }

    /// Patch start and end of a pending sample (root samples learn their span last)
    pub fn set_start_and_end(
        &mut self,
        index: SampleIndex,
        start_ms: f64,
        end_ms: f64,
    ) -> Result<(), StructuralError> {
        let sample = self.patchable(index)?;
        sample.start_ms = start_ms;
        sample.duration_ms = end_ms - start_ms;
        sample.patched = true;
        Ok(())
    }

    /// Seal the pending frame
    ///
    /// # Returns
    /// Index of the sealed frame
    pub fn advance_frame(&mut self, frame_duration_ms: f64) -> usize {
        let end = self.samples.len();
        let frame = self.frames.push(self.pending_start, end, frame_duration_ms);
        debug!(
            "Sealed frame {} with {} samples ({:.3} ms)",
            frame,
            end - self.pending_start,
            frame_duration_ms
        );
        self.pending_start = end;
        frame
    }

    /// Drop every sample of the pending frame
    ///
    /// # Returns
    /// Number of samples discarded
    pub fn discard_pending_frame(&mut self) -> usize {
        let discarded = self.samples.len() - self.pending_start;
        self.samples.truncate(self.pending_start);
        discarded
    }

    /// Sample at `index`, or the invalid sentinel when out of range
    pub fn sample(&self, index: SampleIndex) -> &Sample {
        self.samples.get(index).unwrap_or(&INVALID_SAMPLE)
    }

    /// Samples of all sealed frames
    pub fn sealed_samples(&self) -> &[Sample] {
        &self.samples[..self.pending_start]
    }

    /// Index range of the frame being built
    pub fn pending_range(&self) -> Range<usize> {
        self.pending_start..self.samples.len()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, frame: usize) -> Option<&FrameRecord> {
        self.frames.get(frame)
    }

    pub fn frame_index(&self) -> &FrameIndex {
        &self.frames
    }

    pub fn total_elapsed_ms(&self) -> f64 {
        self.frames.total_elapsed_ms()
    }

    /// Sample index range `(start, end)` of a sealed frame
    pub fn samples_for_frame(&self, frame: usize) -> Option<(usize, usize)> {
        self.frames.get(frame).map(|r| (r.start_index, r.end_index))
    }

    /// Samples of a sealed frame; empty for unknown frames
    pub fn frame_samples(&self, frame: usize) -> &[Sample] {
        match self.frames.get(frame) {
            Some(record) => &self.samples[record.sample_range()],
            None => &[],
        }
    }

    /// Root sample of a sealed frame (always its first sample)
    pub fn frame_root(&self, frame: usize) -> Option<SampleIndex> {
        let record = self.frames.get(frame)?;
        let root = self.samples.get(record.start_index)?;
        (record.end_index > record.start_index && root.kind.is_hierarchical() && root.parent.is_none())
            .then_some(record.start_index)
    }

    /// See `FrameIndex::frames_overlapping_time`
    pub fn frames_overlapping_time(&self, start_ms: f64, end_ms: f64) -> Option<(usize, usize)> {
        self.frames.frames_overlapping_time(start_ms, end_ms)
    }

    fn check_pending(&self, index: SampleIndex) -> Result<(), StructuralError> {
        if index >= self.samples.len() {
            return Err(StructuralError::InvalidSampleIndex {
                index,
                len: self.samples.len(),
            });
        }
        if index < self.pending_start {
            return Err(StructuralError::SealedSample(index));
        }
        Ok(())
    }

    fn patchable(&mut self, index: SampleIndex) -> Result<&mut Sample, StructuralError> {
        self.check_pending(index)?;
        let sample = &mut self.samples[index];
        if sample.patched {
            return Err(StructuralError::AlreadyPatched(index));
        }
        Ok(sample)
    }
}
