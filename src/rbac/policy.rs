//! Handling of role and permission names that do not exist
//!
//! `ResolveOrSkip` keeps the historical best-effort behaviour but makes the
//! drop observable: unknown names are logged and returned to the caller.
//! `Strict` rejects the whole request instead.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{BiolinkerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameResolution {
    #[default]
    ResolveOrSkip,
    Strict,
}

/// Outcome of resolving requested names against what exists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub ids: Vec<i64>,
    /// Requested names with no match, sorted, without duplicates
    pub unresolved: Vec<String>,
}

impl NameResolution {
    /// Match `requested` against `found` (`(name, id)` pairs).
    ///
    /// Names are trimmed; blank entries are ignored. `kind` only feeds the
    /// log line and the validation message.
    pub fn apply(
        self,
        kind: &str,
        requested: &[String],
        found: Vec<(String, i64)>,
    ) -> Result<Resolved> {
        let found: HashMap<String, i64> = found.into_iter().collect();

        let mut ids = BTreeSet::new();
        let mut unresolved = BTreeSet::new();
        for name in requested.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            match found.get(name) {
                Some(id) => {
                    ids.insert(*id);
                }
                None => {
                    unresolved.insert(name.to_string());
                }
            }
        }

        let unresolved: Vec<String> = unresolved.into_iter().collect();
        if !unresolved.is_empty() {
            match self {
                NameResolution::Strict => {
                    return Err(BiolinkerError::validation(format!(
                        "unknown {} name(s): {}",
                        kind,
                        unresolved.join(", ")
                    )));
                }
                NameResolution::ResolveOrSkip => {
                    warn!(
                        "Skipping unknown {} name(s): {}",
                        kind,
                        unresolved.join(", ")
                    );
                }
            }
        }

        Ok(Resolved {
            ids: ids.into_iter().collect(),
            unresolved,
        })
    }
}

/// Trimmed, non-blank, de-duplicated names in first-seen order
pub fn clean_names(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}
