mod api;
mod config;
mod console;
mod csvio;
mod errors;
mod ipc;
mod model;
mod stats;
mod transition;
mod view;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coursedeskd")]
#[command(about = "Collection-management sidecar for the CourseDesk admin shell", long_about = None)]
struct Cli {
    /// Optional TOML config file; defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter, overridden by RUST_LOG when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is the protocol channel; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load(cli.config.as_deref())?;
    let state: ipc::SharedState = Arc::new(Mutex::new(ipc::AppState::new(cfg)));

    // Requests run as tasks and answer whenever their remote calls land, so
    // responses can leave in a different order than their requests arrived.
    // One writer task keeps output lines whole.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't address a reply without an id; report and move on.
                let _ = tx.send(format!(
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                ));
                continue;
            }
        };

        let state = state.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let resp = ipc::handle_request(state, req).await;
            let _ = tx.send(resp.to_string());
        });
    }

    drop(tx);
    let _ = writer.await;
    Ok(())
}
