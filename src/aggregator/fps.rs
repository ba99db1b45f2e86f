//! Frame-rate histogram and summary.

use crate::utils::config::{FpsHistogramConfig, DEFAULT_FPS_INTERVAL, DEFAULT_FPS_MAX, DEFAULT_FPS_MIN};
use serde::Serialize;

/// Histogram of per-frame FPS samples
#[derive(Debug, Clone)]
pub struct FpsAnalyzer {
    interval: u32,
    min_fps: u32,
    max_fps: u32,
    buckets: Vec<u64>,
    sample_count: u64,
    sum: f64,
    lowest: f64,
    highest: f64,
    at_least_20: u64,
    at_least_30: u64,
    at_least_60: u64,
}

/// Serializable snapshot of an `FpsAnalyzer`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FpsSummary {
    pub sample_count: u64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub avg_fps: f64,
    pub pct_at_least_20: f64,
    pub pct_at_least_30: f64,
    pub pct_at_least_60: f64,
    pub bucket_interval: u32,
    pub buckets: Vec<u64>,
}

impl Default for FpsAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_INTERVAL, DEFAULT_FPS_MIN, DEFAULT_FPS_MAX)
    }
}

impl FpsAnalyzer {
    /// Buckets of width `interval` covering `[min_fps, max_fps)`
    ///
    /// Samples below the range land in the first bucket, samples at or above
    /// it in the last one.
    pub fn new(interval: u32, min_fps: u32, max_fps: u32) -> Self {
        let interval = interval.max(1);
        let num_buckets = (max_fps.saturating_sub(min_fps) / interval).max(1) as usize;
        Self {
            interval,
            min_fps,
            max_fps,
            buckets: vec![0; num_buckets],
            sample_count: 0,
            sum: 0.0,
            lowest: f64::MAX,
            highest: 0.0,
            at_least_20: 0,
            at_least_30: 0,
            at_least_60: 0,
        }
    }

    pub fn from_config(config: &FpsHistogramConfig) -> Self {
        Self::new(config.interval, config.min_fps, config.max_fps)
    }

    pub fn add_sample(&mut self, fps: f64) {
        let offset = (fps - self.min_fps as f64).max(0.0);
        let bucket = ((offset / self.interval as f64) as usize).min(self.buckets.len() - 1);
        self.buckets[bucket] += 1;

        self.sample_count += 1;
        self.sum += fps;
        self.lowest = self.lowest.min(fps);
        self.highest = self.highest.max(fps);

        if fps >= 20.0 {
            self.at_least_20 += 1;
        }
        if fps >= 30.0 {
            self.at_least_30 += 1;
        }
        if fps >= 60.0 {
            self.at_least_60 += 1;
        }
    }

    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// FPS range `[low, high)` covered by bucket `index`
    pub fn bucket_range(&self, index: usize) -> (u32, u32) {
        let low = self.min_fps + index as u32 * self.interval;
        (low, low + self.interval)
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn min_fps(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.lowest
        }
    }

    pub fn max_fps(&self) -> f64 {
        self.highest
    }

    pub fn avg_fps(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.sum / self.sample_count as f64
        }
    }

    pub fn pct_at_least_20(&self) -> f64 {
        self.pct(self.at_least_20)
    }

    pub fn pct_at_least_30(&self) -> f64 {
        self.pct(self.at_least_30)
    }

    pub fn pct_at_least_60(&self) -> f64 {
        self.pct(self.at_least_60)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.interval, self.min_fps, self.max_fps);
    }

    pub fn summary(&self) -> FpsSummary {
        FpsSummary {
            sample_count: self.sample_count,
            min_fps: self.min_fps(),
            max_fps: self.max_fps(),
            avg_fps: self.avg_fps(),
            pct_at_least_20: self.pct_at_least_20(),
            pct_at_least_30: self.pct_at_least_30(),
            pct_at_least_60: self.pct_at_least_60(),
            bucket_interval: self.interval,
            buckets: self.buckets.clone(),
        }
    }

    fn pct(&self, count: u64) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        count as f64 * 100.0 / self.sample_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let analyzer = FpsAnalyzer::default();
        assert_eq!(analyzer.buckets().len(), 12);
        assert_eq!(analyzer.bucket_range(1), (5, 10));
    }

    #[test]
    fn test_out_of_range_samples_clamp() {
        let mut analyzer = FpsAnalyzer::new(5, 10, 60);
        analyzer.add_sample(2.0);
        analyzer.add_sample(60.0);
        analyzer.add_sample(144.0);
        analyzer.add_sample(33.0);

        let buckets = analyzer.buckets();
        assert_eq!(buckets[0], 1);
        assert_eq!(buckets[buckets.len() - 1], 2);
        assert_eq!(buckets[4], 1);
    }

    #[test]
    fn test_summary_values() {
        let mut analyzer = FpsAnalyzer::default();
        for fps in [15.0, 25.0, 35.0, 65.0] {
            analyzer.add_sample(fps);
        }
        assert_eq!(analyzer.min_fps(), 15.0);
        assert_eq!(analyzer.max_fps(), 65.0);
        assert_eq!(analyzer.avg_fps(), 35.0);
        assert_eq!(analyzer.pct_at_least_20(), 75.0);
        assert_eq!(analyzer.pct_at_least_30(), 50.0);
        assert_eq!(analyzer.pct_at_least_60(), 25.0);
    }

    #[test]
    fn test_reset_keeps_shape() {
        let mut analyzer = FpsAnalyzer::new(10, 0, 120);
        analyzer.add_sample(50.0);
        analyzer.reset();
        assert_eq!(analyzer.sample_count(), 0);
        assert_eq!(analyzer.buckets().len(), 12);
        assert!(analyzer.buckets().iter().all(|&count| count == 0));
    }
}
