//! Model directory loading: one JSON table per vessel class.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::state_key::StateKey;
use crate::transition::{TransitionModel, TransitionTable};
use crate::vessel_class::VesselClass;

/// File-name prefix in front of the class name.
const FILE_PREFIX: &str = "h3_transition_model_class_";

pub(crate) fn load_dir(dir: &Path) -> Result<TransitionModel> {
    if !dir.is_dir() {
        return Err(ModelError::MissingSource(dir.to_path_buf()));
    }

    let mut model = TransitionModel::new();
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    for path in paths {
        let Some(class) = class_for_file(&path) else {
            warn!(path = %path.display(), "skipping model file with unknown vessel class");
            continue;
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read model file");
                continue;
            }
        };

        match parse_table(&raw) {
            Ok((table, skipped)) => {
                if skipped > 0 {
                    warn!(path = %path.display(), skipped, "skipped malformed model entries");
                }
                info!(class = %class, states = table.len(), "loaded transition table");
                model.insert_table(class, table);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse model file");
            }
        }
    }

    info!(
        path = %dir.display(),
        classes = ?model.classes(),
        "transition model loaded"
    );
    Ok(model)
}

fn class_for_file(path: &Path) -> Option<VesselClass> {
    let stem = path.file_stem()?.to_str()?;
    let name = match stem.get(..FILE_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(FILE_PREFIX) => &stem[FILE_PREFIX.len()..],
        _ => stem,
    };
    name.parse().ok()
}

/// Parse one class table, returning it with the number of skipped entries.
///
/// Entries are skipped individually: a bad state key, a non-object outcome
/// map, or a non-numeric cell id / probability drops only that entry.
fn parse_table(raw: &str) -> std::result::Result<(TransitionTable, usize), serde_json::Error> {
    let rows: IndexMap<String, Value> = serde_json::from_str(raw)?;
    let mut table = TransitionTable::with_capacity(rows.len());
    let mut skipped = 0usize;

    for (key, outcomes) in rows {
        let Some(state) = StateKey::parse(&key) else {
            skipped += 1;
            continue;
        };
        let Value::Object(outcomes) = outcomes else {
            skipped += 1;
            continue;
        };

        let mut row = IndexMap::with_capacity(outcomes.len());
        // `preserve_order` keeps the map in source order.
        for (cell, prob) in outcomes {
            match (cell.trim().parse::<u64>(), prob.as_f64()) {
                (Ok(cell), Some(prob)) => {
                    row.insert(cell, prob);
                }
                _ => skipped += 1,
            }
        }
        table.insert(state, row);
    }

    Ok((table, skipped))
}
