//! [`RuleLoader`]: directory scan and per-file rule parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::schema::Rule;

use super::error::{LoadResult, LoadStatus, Result, RuleError};

const RULE_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// Filesystem-backed rule loader.
///
/// Keeps the last successfully parsed rules of every file, so a file that
/// fails to parse during a reload keeps contributing its previous version.
pub struct RuleLoader {
    rules_dir: PathBuf,
    files: RwLock<BTreeMap<PathBuf, Vec<Rule>>>,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        let rules_dir = rules_dir.into();
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            files: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Scan the rules directory recursively and reload every rule file.
    ///
    /// Dotfiles and dot-directories are skipped. Parse errors are reported
    /// per file and never abort the scan. Files that disappeared are dropped.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        let mut parsed = Vec::new();
        scan_dir(&self.rules_dir, &mut results, &mut parsed)?;

        let mut files = self.files_mut();
        let mut previous = std::mem::take(&mut *files);
        for (path, outcome) in parsed {
            match outcome {
                Some(rules) => {
                    files.insert(path, rules);
                }
                None => {
                    if let Some(kept) = previous.remove(&path) {
                        debug!(path = %path.display(), rules = kept.len(), "keeping previous version");
                        files.insert(path, kept);
                    }
                }
            }
        }
        for gone in previous.keys() {
            info!(path = %gone.display(), "rule file removed");
        }

        Ok(results)
    }

    /// Parse one rule file holding a single rule or a list of rules.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Rule>> {
        parse_file(path)
    }

    /// Current rule set in file path order.
    ///
    /// When an id appears more than once, the later file wins.
    pub fn rules(&self) -> Vec<Rule> {
        let files = self.files_ref();
        let mut out: Vec<Rule> = Vec::new();
        for (path, rules) in files.iter() {
            for rule in rules {
                match out.iter().position(|r| r.id == rule.id) {
                    Some(i) => {
                        warn!(rule_id = %rule.id, path = %path.display(), "duplicate rule id, later file wins");
                        out[i] = rule.clone();
                    }
                    None => out.push(rule.clone()),
                }
            }
        }
        out
    }

    /// Number of files currently contributing rules.
    pub fn file_count(&self) -> usize {
        self.files_ref().len()
    }

    fn files_ref(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, Vec<Rule>>> {
        match self.files.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn files_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, Vec<Rule>>> {
        match self.files.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Whether `path` names a loadable rule file.
pub(super) fn is_rule_file(path: &Path) -> bool {
    let dotfile = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    let known_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| RULE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false);
    !dotfile && known_ext
}

/// Recursively scan a directory, recording a parse outcome per rule file.
fn scan_dir(
    dir: &Path,
    results: &mut Vec<LoadResult>,
    parsed: &mut Vec<(PathBuf, Option<Vec<Rule>>)>,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to read directory");
            return Ok(());
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry?.path());
    }
    paths.sort();

    for path in paths {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                if path.is_file() {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }
        }

        if path.is_dir() {
            scan_dir(&path, results, parsed)?;
            continue;
        }

        if !is_rule_file(&path) {
            results.push(LoadResult {
                path,
                status: LoadStatus::Skipped {
                    reason: "not a rule file".to_string(),
                },
            });
            continue;
        }

        match parse_file(&path) {
            Ok(rules) => {
                let rule_ids: Vec<String> = rules.iter().map(|r| r.id.clone()).collect();
                info!(path = %path.display(), rules = ?rule_ids, "loaded rule file");
                parsed.push((path.clone(), Some(rules)));
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Loaded { rule_ids },
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load rule file");
                parsed.push((path.clone(), None));
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Failed {
                        error: e.to_string(),
                    },
                });
            }
        }
    }

    Ok(())
}

fn parse_file(path: &Path) -> Result<Vec<Rule>> {
    let contents = fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
    let rules: Vec<Rule> = match value {
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value)?,
        serde_yaml::Value::Null => Vec::new(),
        other => vec![serde_yaml::from_value(other)?],
    };

    if let Some(rule) = rules.iter().find(|r| r.id.trim().is_empty()) {
        return Err(RuleError::Validation(format!(
            "rule id must not be empty (alertType '{}')",
            rule.action.alert_type
        )));
    }

    Ok(rules)
}
