//! seawatch-worker — runs the vessel rule engine over a JSON-lines event stream.
//!
//! Loads rules from a directory (hot-reloaded on change), optionally preloads
//! a transition model, reads one `VesselEvent` JSON document per line from a
//! file or stdin, and writes every alert to the log and to stdout as JSON.
//!
//! Stops on end of input or Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seawatch_core::config::{load_dotenv, Config};
use seawatch_core::VesselEvent;
use seawatch_dispatch::{AlertSink, Dispatcher, EventProcessor, JsonLinesSink, LogSink};
use seawatch_model::TransitionModel;
use seawatch_rules::loader::{reload, DEFAULT_DEBOUNCE};
use seawatch_rules::{EngineSettings, EvalContext, RuleEngine, RuleLoader, RuleWatcher};

// ── CLI ─────────────────────────────────────────────────────────────

/// Vessel rule engine worker.
#[derive(Parser, Debug)]
#[command(name = "seawatch-worker", version, about)]
struct Cli {
    /// Configuration profile (keys are looked up as {PROFILE}_{KEY} first).
    #[arg(long, env = "SEAWATCH_PROFILE", default_value = "")]
    profile: String,

    /// Rules directory. Overrides RULES_DIR.
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Transition model directory to preload. Overrides MODEL_DIR.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// JSON-lines event file. Reads stdin when omitted or `-`.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Disable hot-reload of the rules directory.
    #[arg(long)]
    no_watch: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::for_profile(&cli.profile);
    if let Some(dir) = cli.rules_dir {
        config.rules.dir = dir;
    }
    if cli.model_dir.is_some() {
        config.model.dir = cli.model_dir;
    }
    if cli.no_watch {
        config.rules.watch = false;
    }
    config.log_summary();

    // A configured model directory must exist.
    let mut ctx = EvalContext::new();
    if let Some(dir) = &config.model.dir {
        let model = Arc::new(TransitionModel::load_dir(dir)?);
        info!(path = %dir.display(), classes = ?model.classes(), "transition model preloaded");
        ctx = ctx.with_default_model(Arc::clone(&model)).with_model(dir, model);
    }

    let engine = Arc::new(RuleEngine::new(
        Arc::new(ctx),
        EngineSettings::from(&config.engine),
    ));

    let loader = Arc::new(RuleLoader::new(config.rules.dir.clone()));
    let diff = reload(&loader, &engine).await?;
    info!(rules = diff.added.len(), "initial rules loaded");

    let cancel = CancellationToken::new();
    let watcher = if config.rules.watch {
        Some(RuleWatcher::spawn(
            Arc::clone(&loader),
            Arc::clone(&engine),
            DEFAULT_DEBOUNCE,
            cancel.child_token(),
        )?)
    } else {
        None
    };

    let sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(LogSink), Arc::new(JsonLinesSink::stdout())];
    let processor = EventProcessor::new(Arc::clone(&engine), Arc::new(Dispatcher::with_defaults(sinks)));
    let processing = processor.start(cancel.child_token())?;

    let input: Box<dyn AsyncRead + Send + Unpin> = match cli.events.as_deref() {
        Some(path) if path != Path::new("-") => Box::new(tokio::fs::File::open(path).await?),
        _ => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                cancel.cancel();
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    line_no += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match VesselEvent::from_json(&line) {
                        Ok(event) => processor.enqueue(event)?,
                        Err(e) => warn!(line = line_no, error = %e, "skipping malformed event"),
                    }
                }
                None => {
                    info!(lines = line_no, "end of input");
                    break;
                }
            },
        }
    }

    // Drain queued events unless interrupted.
    processor.close();
    if let Err(e) = processing.await {
        warn!(error = %e, "event processor task failed");
    }

    cancel.cancel();
    if let Some(watcher) = watcher {
        watcher.join().await;
    }
    engine.shutdown().await;

    let stats = processor.stats();
    info!(
        events = stats.events(),
        alerts = stats.alerts(),
        "seawatch-worker exited cleanly"
    );
    Ok(())
}
