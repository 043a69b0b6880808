//! mediarpc - media operations over stdio JSON-RPC
//!
//! Entry point: loads configuration, sets up logging (stderr + rolling file,
//! stdout is reserved for protocol traffic) and runs the selected command.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mediarpc::catalog::Catalog;
use mediarpc::cli::{Args, Commands};
use mediarpc::config::Config;
use mediarpc::dispatch::Dispatcher;
use mediarpc::process::{check_tool, ProcessRunner, TokioProcessRunner};
use mediarpc::server::Server;
use mediarpc::workspace::LocalWorkspace;

const DEFAULT_CONFIG_FILE: &str = "mediarpc.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Keep the guard alive so buffered file logs get flushed on exit
    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting mediarpc {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env_overrides();
    config.validate()?;

    let catalog = Arc::new(Catalog::builtin()?);
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new());
    let dispatcher = Arc::new(Dispatcher::new(
        catalog.clone(),
        &config,
        runner.clone(),
        Arc::new(LocalWorkspace::new()),
    ));

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(
                "Serving {} operations on stdio (ffmpeg: {}, ffprobe: {}, whisper: {})",
                catalog.len(),
                config.tools.ffmpeg_path,
                config.tools.ffprobe_path,
                config.tools.whisper_path
            );
            let server = Server::new(dispatcher, config.server.max_concurrent_requests);
            server.serve_stdio().await?;
        }
        Commands::Operations { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.list())?);
            } else {
                print_operations(&catalog);
            }
        }
        Commands::Call { operation, args } => {
            let raw: Map<String, Value> =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let envelope = dispatcher.dispatch(&operation, &raw).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if !envelope.success {
                std::process::exit(1);
            }
        }
        Commands::Check => {
            let mut all_ok = true;
            for (program, flag) in [
                (config.tools.ffmpeg_path.as_str(), "-version"),
                (config.tools.ffprobe_path.as_str(), "-version"),
                (config.tools.whisper_path.as_str(), "--help"),
            ] {
                match check_tool(runner.as_ref(), program, flag).await {
                    Ok(version) => println!("{:<10} {:<30} {}", "OK", program, version),
                    Err(e) => {
                        all_ok = false;
                        println!("{:<10} {:<30} {}", "MISSING", program, e);
                    }
                }
            }
            if !all_ok {
                std::process::exit(1);
            }
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

fn print_operations(catalog: &Catalog) {
    println!("\nAvailable operations:");
    println!("{}", "-".repeat(80));
    for descriptor in catalog.list() {
        println!("{}", descriptor.name);
        println!("  {}", descriptor.description);
        for param in &descriptor.params {
            let marker = if descriptor.is_required(&param.name) { "*" } else { " " };
            let default = param
                .default
                .as_ref()
                .map(|d| format!(" (default: {})", d))
                .unwrap_or_default();
            println!("  {} {:<16} {:<16}{}", marker, param.name, param.param_type.to_string(), default);
        }
        println!();
    }
    println!("* required");
}

fn setup_logging(verbose: bool) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console layer goes to stderr: stdout carries protocol messages
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // Daily rotating file under ./.mediarpc/log, skipped if the directory can't be created
    let log_dir = std::env::current_dir()?.join(".mediarpc").join("log");
    let (file_layer, guard, dir_error) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let file_appender = rolling::daily(&log_dir, "mediarpc.log");
            let (non_blocking_file, guard) = non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Some(e) = dir_error {
        warn!("File logging disabled, cannot create {}: {}", log_dir.display(), e);
    }

    Ok(guard)
}
