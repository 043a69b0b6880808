use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve JSON-RPC requests on stdin/stdout (default)
    Serve,

    /// List the available operations and their parameters
    Operations {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single operation and print the response envelope
    Call {
        /// Operation name, e.g. resize_video
        operation: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Check that ffmpeg, ffprobe and the speech-to-text tool can be started
    Check,

    /// Write a configuration file with default values
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "mediarpc.toml")]
        path: PathBuf,
    },
}
