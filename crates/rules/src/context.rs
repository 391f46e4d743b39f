//! Shared evaluation context.
//!
//! Holds the transition models used by position-anomaly conditions. Built
//! once by the caller and shared by the engine and every worker.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use seawatch_model::TransitionModel;
use tracing::{info, warn};

type ModelCell = Arc<OnceLock<Option<Arc<TransitionModel>>>>;

/// Lazily loaded models keyed by directory.
///
/// Each directory is loaded at most once. A failed load is cached as
/// unavailable so later lookups fail open without retrying.
#[derive(Debug, Default)]
pub struct ModelStore {
    default: Option<Arc<TransitionModel>>,
    cells: Mutex<HashMap<PathBuf, ModelCell>>,
}

impl ModelStore {
    fn cell(&self, folder: &Path) -> ModelCell {
        let mut cells = match self.cells.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cells.entry(folder.to_path_buf()).or_default().clone()
    }

    fn preload(&self, folder: &Path, model: Arc<TransitionModel>) {
        let cell = self.cell(folder);
        if cell.set(Some(model)).is_err() {
            warn!(path = %folder.display(), "model already loaded, keeping existing");
        }
    }

    fn get(&self, folder: Option<&Path>) -> Option<Arc<TransitionModel>> {
        let Some(folder) = folder else {
            return self.default.clone();
        };

        // The map lock is released before loading; concurrent first lookups
        // block on the same cell instead.
        let cell = self.cell(folder);
        cell.get_or_init(|| match TransitionModel::load_dir(folder) {
            Ok(model) => {
                info!(path = %folder.display(), "transition model ready");
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!(path = %folder.display(), error = %e, "transition model unavailable");
                None
            }
        })
        .clone()
    }
}

/// Read-only resources available to every condition.
#[derive(Debug, Default)]
pub struct EvalContext {
    models: ModelStore,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model used by anomaly conditions that name no folder.
    pub fn with_default_model(mut self, model: Arc<TransitionModel>) -> Self {
        self.models.default = Some(model);
        self
    }

    /// Register an already loaded model for `folder`.
    pub fn with_model(self, folder: impl AsRef<Path>, model: Arc<TransitionModel>) -> Self {
        self.models.preload(folder.as_ref(), model);
        self
    }

    /// Model for `folder`, loading it on first use.
    pub fn model_for(&self, folder: Option<&Path>) -> Option<Arc<TransitionModel>> {
        self.models.get(folder)
    }
}
