mod config;
mod db;
mod document;
mod error;
mod inbox;
mod ipc;
mod ledger;
mod milestones;
mod model;
mod payments;
mod store;
mod templates;
mod verify;
mod workflow;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Report-card sidecar: newline-delimited JSON requests on stdin, responses on stdout.
#[derive(Parser, Debug)]
#[command(name = "rapotd")]
#[command(version)]
struct Args {
    /// Workspace directory to open at startup
    #[arg(long, env = "RAPOTD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log filter (stderr), e.g. `info` or `rapotd=debug`
    #[arg(long, default_value = "info", env = "RAPOTD_LOG")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the protocol; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let mut state = ipc::AppState::default();
    if let Some(path) = args.workspace {
        ipc::select_workspace(&mut state, path)
            .map_err(|e| anyhow::anyhow!("failed to open workspace: {e}"))?;
    }
    info!(version = env!("CARGO_PKG_VERSION"), "rapotd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!("stdin closed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
