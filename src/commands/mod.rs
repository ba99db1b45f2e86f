//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod info;
pub mod load;

// Re-export main command functions
pub use info::{display_capture_info, display_version};
pub use load::{execute_load, validate_args, validate_frame_range, LoadArgs};
