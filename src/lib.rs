//! frametrace
//!
//! Profiling-data engine for frame-based applications: per-frame sample
//! storage, call-hierarchy reconstruction from raw scope streams, aggregate
//! statistics, event graphs and time-series views.
//!
//! This crate provides the core implementation for the
//! `frametrace` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! frametrace load --file session.ftrace --summary
//! frametrace info --file session.ftrace
//! ```

pub mod aggregator;
pub mod capture;
pub mod commands;
pub mod event_graph;
pub mod graph;
pub mod metadata;
pub mod output;
pub mod reconstruct;
pub mod session;
pub mod store;
pub mod utils;
