//! query-sync: run a sync session against an in-memory location.
//!
//! Usage:
//!   query-sync --defaults '{"page":1,"q":""}' --url 'https://app.test/list?page=2&ref=abc'
//!   query-sync --defaults '{"page":1}' --url 'https://app.test/?page=2' --set '{"page":3}' --push --back

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use openerp_query_sync::{
    HistoryMode, Location, MemoryLocation, QueryMap, QuerySync, SyncOptions,
};

#[derive(Parser, Debug)]
#[command(name = "query-sync", about = "Reconcile state with a URL query string")]
struct Args {
    /// Default state as a JSON object of scalars and scalar arrays.
    #[arg(long)]
    defaults: String,

    /// Starting location.
    #[arg(long)]
    url: String,

    /// Replacement state (JSON object) applied after init.
    #[arg(long)]
    set: Option<String>,

    /// Reset to defaults after init (and after --set).
    #[arg(long)]
    reset: bool,

    /// Write with a new history entry instead of replacing the current one.
    #[arg(long)]
    push: bool,

    /// Step back one history entry at the end.
    #[arg(long)]
    back: bool,

    /// Disable URL synchronization.
    #[arg(long)]
    no_sync: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let defaults = QueryMap::from_json_str(&args.defaults).context("invalid --defaults")?;
    let update = args
        .set
        .as_deref()
        .map(QueryMap::from_json_str)
        .transpose()
        .context("invalid --set")?;

    let location = Arc::new(MemoryLocation::new(&args.url));
    let history = if args.push {
        HistoryMode::Push
    } else {
        HistoryMode::Replace
    };
    let options = SyncOptions::default()
        .with_history(history)
        .with_sync_pathname(!args.no_sync);
    let sync = QuerySync::init(defaults, location.clone(), options);
    report("init", &sync, &location)?;

    if let Some(state) = update {
        sync.set_state(state);
        report("set", &sync, &location)?;
    }
    if args.reset {
        sync.reset();
        report("reset", &sync, &location)?;
    }
    if args.back {
        if location.back() {
            report("back", &sync, &location)?;
        } else {
            info!("no earlier history entry");
        }
    }

    Ok(())
}

fn report(step: &str, sync: &QuerySync, location: &MemoryLocation) -> anyhow::Result<()> {
    let line = serde_json::json!({
        "step": step,
        "state": sync.state().to_json(),
        "url": location.href(),
        "writes": location.write_count(),
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
