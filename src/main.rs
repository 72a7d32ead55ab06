//! # Hangman Bot Runner
//!
//! Runs the guild router against a line-oriented transport, for local play and for gateways
//! that speak JSON over a pipe.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in gallows, one lane per spare hardware thread
//! hangman
//!
//! # Custom stage graphics on two lanes
//! hangman --stages art/gallows.txt --lanes 2
//! ```
//!
//! Each stdin line is an event such as
//! `{"author_id":1,"author_name":"ann","channel":{"kind":"group","group_id":7,"channel_id":70},"text":"!hangman-start"}`;
//! each stdout line is a message such as `{"destination":{"to":"channel","id":70},"text":"..."}`.
//! Logs go to stderr and are filtered with `RUST_LOG`.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hangman::{
    GroupRouter, HangmanCli, InboundEvent, adapter::console::ConsoleTransport, domain::constant::app, load_settings
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, event};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,hangman=info".into())
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = HangmanCli::parse();
    let settings = cli.apply(load_settings(cli.config.as_deref())?);
    let stages = settings.load_stages()?;

    let (console, writer) = ConsoleTransport::spawn();
    let router = GroupRouter::spawn(&settings, Arc::new(console), stages).await?;
    event!(Level::INFO, event = app::STARTED, lanes = %router.lane_count());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => feed(&router, &line),
                None => {
                    event!(Level::DEBUG, event = app::INPUT_CLOSED);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                event!(Level::INFO, event = app::INTERRUPTED);
                break;
            }
        }
    }

    let stats = router.stats().await?;
    router.shutdown().await;
    writer.await?;

    event!(Level::INFO, event = app::STOPPED, groups = %stats.groups, events_handled = %stats.events_handled());
    Ok(())
}

/// Decode one input line and dispatch it; bad lines are logged and skipped
fn feed(router: &GroupRouter, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<InboundEvent>(line) {
        Ok(inbound) => {
            router.dispatch(inbound);
        }
        Err(e) => event!(Level::WARN, event = app::INPUT_REJECTED, error = %e)
    }
}
