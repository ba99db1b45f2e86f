//! Configuration and constants for the engine and CLI.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Reserved stat ids. Self must be 0, ThreadRoot must be 1.
pub const SELF_STAT_ID: u32 = 0;
pub const THREAD_ROOT_STAT_ID: u32 = 1;
pub const FRAME_TIME_STAT_ID: u32 = 2;

/// Group owning the reserved stats
pub const NO_GROUP_ID: u32 = 0;
pub const NO_GROUP_NAME: &str = "NoGroup";

pub const SELF_STAT_NAME: &str = "Self";
pub const THREAD_ROOT_STAT_NAME: &str = "ThreadRoot";

/// Group holding one stat per thread
pub const THREADS_GROUP_NAME: &str = "Threads";
/// Catch-all group for ungrouped, non-thread stats
pub const OBJECTS_GROUP_NAME: &str = "Objects";

// Thread-role name patterns (substring match against display names)
pub const GAME_THREAD_PATTERN: &str = "GameThread";
pub const RENDER_THREAD_PATTERNS: &[&str] = &["RenderThread", "RenderingThread"];

// Prefixes stripped from incoming metadata names
pub const STAT_NAME_PREFIX: &str = "STAT_";
pub const GROUP_NAME_PREFIX: &str = "STATGROUP_";

/// Float counter carrying the cycle-to-seconds factor
pub const SECONDS_PER_CYCLE_STAT: &str = "SecondsPerCycle";
/// Upper bound for an accepted cycle-to-seconds factor
pub const MAX_SECONDS_PER_CYCLE: f64 = 1.0;

/// Default wall-clock budget for one ingestion tick
pub const DEFAULT_TICK_BUDGET: Duration = Duration::from_millis(30);

/// Session events kept for a receiver that has not been taken yet
pub const MAX_UNOBSERVED_EVENTS: usize = 256;

// Per-tick frame caps
pub const DEFAULT_LIVE_FRAMES_PER_TICK: usize = 2;
pub const DEFAULT_FILE_FRAMES_PER_TICK: usize = 240;

// FPS histogram shape
pub const DEFAULT_FPS_INTERVAL: u32 = 5;
pub const DEFAULT_FPS_MIN: u32 = 0;
pub const DEFAULT_FPS_MAX: u32 = 60;

/// Accepted time-accuracy settings (buckets per second)
pub const TIME_ACCURACY_CHOICES: &[u32] = &[8, 15, 30, 60, 120];

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget per ingestion tick, in milliseconds
    pub tick_budget_ms: u64,

    /// Frames processed per tick for live sessions
    pub live_frames_per_tick: usize,

    /// Frames processed per tick for file-backed sessions
    pub file_frames_per_tick: usize,

    /// Time-series cache granularity (buckets per second)
    pub time_accuracy: u32,

    /// FPS histogram shape
    pub fps_histogram: FpsHistogramConfig,

    /// Minimum inclusive percentage for a node to be on the hot path
    pub hot_path_threshold_pct: f64,
}

/// FPS histogram shape
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FpsHistogramConfig {
    pub interval: u32,
    pub min_fps: u32,
    pub max_fps: u32,
}

impl Default for FpsHistogramConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FPS_INTERVAL,
            min_fps: DEFAULT_FPS_MIN,
            max_fps: DEFAULT_FPS_MAX,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_budget_ms: DEFAULT_TICK_BUDGET.as_millis() as u64,
            live_frames_per_tick: DEFAULT_LIVE_FRAMES_PER_TICK,
            file_frames_per_tick: DEFAULT_FILE_FRAMES_PER_TICK,
            time_accuracy: 60,
            fps_histogram: FpsHistogramConfig::default(),
            hot_path_threshold_pct: 20.0,
        }
    }
}

impl EngineConfig {
    /// Tick budget as a `Duration`
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }

    /// Check value ranges
    ///
    /// **Public** - called by `load_config`, usable on hand-built configs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_budget_ms == 0 {
            return Err(ConfigError::Invalid("tick_budget_ms must be greater than 0".into()));
        }
        if self.live_frames_per_tick == 0 || self.file_frames_per_tick == 0 {
            return Err(ConfigError::Invalid("frames per tick must be greater than 0".into()));
        }
        if !TIME_ACCURACY_CHOICES.contains(&self.time_accuracy) {
            return Err(ConfigError::Invalid(format!(
                "time_accuracy must be one of {:?}, got {}",
                TIME_ACCURACY_CHOICES, self.time_accuracy
            )));
        }
        let fps = &self.fps_histogram;
        if fps.interval == 0 || fps.max_fps <= fps.min_fps {
            return Err(ConfigError::Invalid(format!(
                "fps_histogram needs interval > 0 and max_fps > min_fps (got {}, {}..{})",
                fps.interval, fps.min_fps, fps.max_fps
            )));
        }
        if !(0.0..=100.0).contains(&self.hot_path_threshold_pct) {
            return Err(ConfigError::Invalid(format!(
                "hot_path_threshold_pct must be within 0..=100, got {}",
                self.hot_path_threshold_pct
            )));
        }
        Ok(())
    }
}

/// Load engine configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the TOML configuration file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::Invalid` - If a value is out of range
///
/// # Example
/// ```ignore
/// let config = load_config("frametrace.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
