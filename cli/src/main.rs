//! tsn-langsrv: TSN language server speaking LSP over stdin/stdout.
//!
//! ```text
//! main() -> init_tracing() -> serve() -> LangsrvConfig::load() -> tsn_lsp::run(stdin, stdout, compiler)
//! ```
//!
//! Stdout carries the protocol, so logs go to `~/.tsn/logs/tsn-langsrv.log`
//! (or `./.tsn/logs/` when the home directory is unusable) and never to the
//! terminal.

mod config;

use std::{
    env,
    fs::{self, OpenOptions},
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tsn_lsp::ExternalCompiler;

use crate::config::{COMPILER_ENV, LangsrvConfig};

const LOG_FILE_NAME: &str = "tsn-langsrv.log";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write into the protocol stream.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = config::tsn_dir() {
        candidates.push(dir.join("logs").join(LOG_FILE_NAME));
    }
    candidates.push(PathBuf::from(".tsn").join("logs").join(LOG_FILE_NAME));
    candidates
}

fn compiler() -> Result<ExternalCompiler> {
    let config = match LangsrvConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Ignoring config: {e}");
            LangsrvConfig::default()
        }
    };
    let env_command = env::var(COMPILER_ENV).ok();
    let compiler_config = config
        .compiler_config(env_command)
        .context("resolving compiler settings")?;
    tracing::info!(
        command = compiler_config.command(),
        args = ?compiler_config.args(),
        timeout_secs = compiler_config.timeout_secs(),
        "Compiler configured"
    );
    Ok(ExternalCompiler::new(compiler_config))
}

async fn serve() -> ExitCode {
    let compiler = match compiler() {
        Ok(compiler) => compiler,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("tsn-langsrv: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match tsn_lsp::run(tokio::io::stdin(), tokio::io::stdout(), compiler).await {
        Ok(reason) => {
            tracing::info!(?reason, "tsn-langsrv exiting");
            ExitCode::from(reason.exit_code())
        }
        Err(e) => {
            tracing::error!("Server failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tsn-langsrv starting");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(serve());
    // A pending stdin read holds a blocking thread that cannot be cancelled.
    runtime.shutdown_background();
    code
}
