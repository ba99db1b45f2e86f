//! frametrace CLI
//!
//! Processes frame profiling captures into aggregate statistics and
//! event graphs.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;

use frametrace::commands::{
    display_capture_info, display_version, execute_load, validate_args, LoadArgs,
};
use frametrace::event_graph::EventGraphKind;

/// frametrace - frame profiling capture analysis
#[derive(Parser, Debug)]
#[command(name = "frametrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Event graph included in the report
#[derive(ValueEnum, Debug, Clone, Copy)]
enum GraphArg {
    /// Per-frame average over the range
    Average,
    /// Per-node maximum over the range
    Maximum,
    /// The last frame (or first frame of the range)
    Frame,
}

impl From<GraphArg> for EventGraphKind {
    fn from(arg: GraphArg) -> Self {
        match arg {
            GraphArg::Average => EventGraphKind::Average,
            GraphArg::Maximum => EventGraphKind::Maximum,
            GraphArg::Frame => EventGraphKind::OneFrame,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a capture file and write a report
    Load {
        /// Capture file to load
        #[arg(short, long)]
        file: PathBuf,

        /// Output path for JSON report
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long, env = "FRAMETRACE_CONFIG")]
        config: Option<PathBuf>,

        /// Event graph to include
        #[arg(long, value_enum, default_value = "average")]
        graph: GraphArg,

        /// First frame of the event graph range
        #[arg(long, requires = "to")]
        from: Option<usize>,

        /// Last frame of the event graph range (inclusive)
        #[arg(long, requires = "from")]
        to: Option<usize>,

        /// Number of stats listed in the report
        #[arg(long, default_value = "50")]
        top_stats: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a capture file and show what it holds
    Info {
        /// Capture file to inspect
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Load {
            file,
            output,
            config,
            graph,
            from,
            to,
            top_stats,
            summary,
        } => {
            let args = LoadArgs {
                capture_file: file,
                output_json: output,
                config_file: config,
                graph_kind: graph.into(),
                frame_range: from.zip(to),
                top_stats,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_load(args)?;
        }

        Commands::Info { file } => {
            display_capture_info(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
