//! hubscout: search GitHub users as you type.
//!
//! Usage:
//!   hubscout                      # Interactive: each stdin line is the search box text
//!   hubscout search <query>       # Run one search immediately
//!   hubscout cache stats|clear    # Inspect the on-disk cache

use clap::{Parser, Subcommand};
use hubscout::api::{GithubClient, Slot};
use hubscout::config::DEFAULT_API_BASE;
use hubscout::db::Database;
use hubscout::fmt::{fmt_advisory, fmt_state};
use hubscout::services::{
    ControllerEvent, CycleOutcome, MemoryCache, SearchCache, SearchController, SearchState,
};
use hubscout::{Generation, SearchConfig};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Upper bound on how long to wait for the last cycle after stdin closes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "hubscout")]
#[command(about = "Search GitHub users as you type")]
#[command(version)]
struct Cli {
    /// Milliseconds the input must be stable before searching
    #[arg(long, default_value = "1000")]
    debounce_ms: u64,

    /// Minimum query length that triggers a search
    #[arg(long, default_value = "3")]
    min_len: usize,

    /// Remaining-quota level that triggers a low-quota warning
    #[arg(long, default_value = "10")]
    low_quota: u64,

    /// API root URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Per-request timeout in seconds (default: no timeout)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Cache database path (default: ~/.cache/hubscout/<hash>.db)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Keep the cache in memory for this run only
    #[arg(long, conflicts_with = "cache")]
    memory_cache: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read search box snapshots from stdin (default)
    Watch,

    /// Search once, without debounce
    Search {
        /// Search query
        query: String,
    },

    /// Inspect or clear the on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the number of cached queries and list them
    Stats,
    /// Delete every cached query
    Clear,
}

impl Cli {
    fn config(&self) -> SearchConfig {
        SearchConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            min_query_len: self.min_len,
            low_quota_threshold: self.low_quota,
            api_base: self.api_base.clone(),
            request_timeout: self.timeout_secs.map(Duration::from_secs),
            ..SearchConfig::default()
        }
    }

    fn cache_path(&self, config: &SearchConfig) -> PathBuf {
        self.cache
            .clone()
            .unwrap_or_else(|| hubscout::default_cache_path(config.api_root()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr only (stdout carries results)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hubscout=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    let color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Some(Commands::Cache { ref action }) => {
            let db = open_database(&cli.cache_path(&config))?;
            run_cache(&db, action)
        }
        Some(Commands::Search { ref query }) => {
            let controller = build_controller(&cli, config)?;
            run_search(&controller, query, color).await
        }
        Some(Commands::Watch) | None => {
            let controller = build_controller(&cli, config)?;
            run_watch(&controller, color).await
        }
    }
}

fn open_database(path: &std::path::Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!("Opening cache at {}", path.display());
    Ok(Database::open(path)?)
}

fn build_controller(
    cli: &Cli,
    config: SearchConfig,
) -> anyhow::Result<SearchController<GithubClient>> {
    let cache: Arc<dyn SearchCache> = if cli.memory_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(open_database(&cli.cache_path(&config))?)
    };
    let remote = Arc::new(GithubClient::new(&config)?);
    Ok(SearchController::new(config, remote, cache)?)
}

fn run_cache(db: &Database, action: &CacheAction) -> anyhow::Result<()> {
    match action {
        CacheAction::Stats => {
            println!("{} cached queries", db.entry_count()?);
            for (query, created_at) in db.queries()? {
                println!("  {created_at}  {query}");
            }
        }
        CacheAction::Clear => {
            let deleted = db.clear()?;
            println!("Removed {deleted} cached queries");
        }
    }
    Ok(())
}

async fn run_search(
    controller: &SearchController<GithubClient>,
    query: &str,
    color: bool,
) -> anyhow::Result<()> {
    let mut events = controller.subscribe();
    let result = controller.search_now(query).await;

    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Advisory(advisory) = event {
            fmt_advisory(&mut std::io::stderr(), &advisory, color)?;
        }
    }

    match result {
        Ok(CycleOutcome::TooShort) => anyhow::bail!(
            "query must be at least {} characters",
            controller.config().min_query_len
        ),
        Ok(_) => {
            fmt_state(&mut std::io::stdout().lock(), &controller.snapshot(), color)?;
            Ok(())
        }
        Err(e) => anyhow::bail!("search failed: {e}"),
    }
}

async fn run_watch(controller: &SearchController<GithubClient>, color: bool) -> anyhow::Result<()> {
    let advisories = tokio::spawn(print_advisories(controller.subscribe(), color));

    // Subscribed up front so the last cycle's terminal event cannot be missed
    let mut events = controller.subscribe();
    let mut state = controller.state();
    let mut shown = Shown::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = false;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.is_empty() => {
                    controller.on_clear(None);
                    pending = false;
                }
                Some(line) => {
                    controller.on_input(&line);
                    pending = line.chars().count() >= controller.config().min_query_len;
                }
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                shown.update(&mut state, color)?;
            }
        }
    }

    if pending {
        let latest = controller.generation();
        let settled = tokio::time::timeout(
            controller.config().debounce + DRAIN_TIMEOUT,
            wait_for_cycle(&mut events, latest),
        )
        .await;
        if settled.is_err() {
            tracing::warn!("Gave up waiting for the last search to finish");
        }
    }
    shown.update(&mut state, color)?;

    advisories.abort();
    Ok(())
}

/// Resolves once the cycle for `generation` has finished, one way or another.
async fn wait_for_cycle(
    events: &mut tokio::sync::broadcast::Receiver<ControllerEvent>,
    generation: Generation,
) {
    loop {
        match events.recv().await {
            Ok(
                ControllerEvent::Emitted { generation: g, .. }
                | ControllerEvent::Discarded { generation: g, .. }
                | ControllerEvent::Suppressed { generation: g, .. },
            ) if g == generation => return,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return,
        }
    }
}

/// Last result list printed, so keystrokes alone do not reprint it.
#[derive(Default)]
struct Shown {
    results: Vec<Slot>,
    no_results_found: bool,
}

impl Shown {
    fn update(&mut self, state: &mut watch::Receiver<SearchState>, color: bool) -> std::io::Result<()> {
        let current = state.borrow_and_update().clone();
        if current.results == self.results && current.no_results_found == self.no_results_found {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        writeln!(out, "── {} ──", current.search_text)?;
        fmt_state(&mut out, &current, color)?;
        self.results = current.results;
        self.no_results_found = current.no_results_found;
        Ok(())
    }
}

async fn print_advisories(
    mut events: tokio::sync::broadcast::Receiver<ControllerEvent>,
    color: bool,
) {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::Advisory(advisory)) => {
                let _ = fmt_advisory(&mut std::io::stderr(), &advisory, color);
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return,
        }
    }
}
