//! Hot-reload: filesystem events trigger a debounced full reload.

use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{RuleDiff, RuleEngine};

use super::core::{is_rule_file, RuleLoader};
use super::error::{LoadStatus, Result, RuleError};

/// Quiet period after the last filesystem event before reloading.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Reload every rule file and push the result into the engine.
///
/// Deleted files drop out of the rule set, so the engine removes their rules.
pub async fn reload(loader: &Arc<RuleLoader>, engine: &RuleEngine) -> Result<RuleDiff> {
    let scan = Arc::clone(loader);
    let results = tokio::task::spawn_blocking(move || scan.load_all())
        .await
        .map_err(|e| RuleError::Validation(format!("reload task failed: {e}")))??;

    let failed = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
        .count();
    if failed > 0 {
        warn!(failed, "some rule files failed to load");
    }

    Ok(engine.hot_update_rules(loader.rules()).await)
}

/// Watches the rules directory and keeps the engine in sync.
///
/// Dropping the watcher stops filesystem notifications; cancel the token to
/// stop the reload task.
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl RuleWatcher {
    /// Start watching. Must be called from within a tokio runtime.
    pub fn spawn(
        loader: Arc<RuleLoader>,
        engine: Arc<RuleEngine>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                match res {
                    Ok(event) if is_relevant(&event) => {
                        // The receiver is gone only after shutdown.
                        let _ = tx.send(());
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "filesystem watcher error"),
                }
            })?;
        watcher.watch(loader.rules_dir(), RecursiveMode::Recursive)?;
        info!(path = %loader.rules_dir().display(), "watching rules directory for changes (recursive)");

        let task = tokio::spawn(reload_loop(rx, loader, engine, debounce, cancel));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Wait for the reload task to finish after cancellation.
    pub async fn join(self) {
        let RuleWatcher { _watcher, task } = self;
        drop(_watcher);
        if let Err(e) = task.await {
            warn!(error = %e, "rule watcher task failed");
        }
    }
}

fn is_relevant(event: &Event) -> bool {
    let kind_matches = match &event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    kind_matches && event.paths.iter().any(|p| is_rule_file(p))
}

/// Collapse bursts of change signals into one reload each.
pub(super) async fn reload_loop(
    mut rx: mpsc::UnboundedReceiver<()>,
    loader: Arc<RuleLoader>,
    engine: Arc<RuleEngine>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            signal = rx.recv() => {
                if signal.is_none() {
                    break;
                }
            }
        }

        // Wait for a quiet period.
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                more = tokio::time::timeout(debounce, rx.recv()) => match more {
                    Ok(Some(())) => continue,
                    Ok(None) | Err(_) => break,
                },
            }
        }

        match reload(&loader, &engine).await {
            Ok(diff) if diff.is_noop() => debug!("rules unchanged after reload"),
            Ok(diff) => info!(
                added = ?diff.added,
                removed = ?diff.removed,
                updated = ?diff.updated,
                "rules reloaded"
            ),
            Err(e) => warn!(error = %e, "rule reload failed"),
        }
    }
    debug!("rule watcher stopped");
}
