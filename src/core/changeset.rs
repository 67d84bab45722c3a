// src/core/changeset.rs

use serde::Serialize;
use std::collections::BTreeMap;

/// A single difference between two selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Added { key: String, value: String },
    Removed { key: String, value: String },
    Changed {
        key: String,
        before: String,
        after: String,
    },
}

/// True iff both maps have the same keys and structurally equal values.
///
/// Values are compared through their JSON serialization, not by identity.
pub fn equals<V: Serialize>(a: &BTreeMap<String, V>, b: &BTreeMap<String, V>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, left)| match b.get(key) {
        Some(right) => match (serde_json::to_value(left), serde_json::to_value(right)) {
            (Ok(l), Ok(r)) => l == r,
            (l, r) => {
                log::warn!(
                    "Could not serialize values of '{}' for comparison ({:?}, {:?}); treating them as different.",
                    key,
                    l.err(),
                    r.err()
                );
                false
            }
        },
        None => false,
    })
}

/// Lists what changed from `before` to `after`, in key order.
pub fn diff(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> Vec<Drift> {
    let mut drift = Vec::new();
    for (key, old) in before {
        match after.get(key) {
            None => drift.push(Drift::Removed {
                key: key.clone(),
                value: old.clone(),
            }),
            Some(new) if new != old => drift.push(Drift::Changed {
                key: key.clone(),
                before: old.clone(),
                after: new.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, new) in after {
        if !before.contains_key(key) {
            drift.push(Drift::Added {
                key: key.clone(),
                value: new.clone(),
            });
        }
    }
    drift.sort_by(|a, b| drift_key(a).cmp(drift_key(b)));
    drift
}

fn drift_key(drift: &Drift) -> &str {
    match drift {
        Drift::Added { key, .. } | Drift::Removed { key, .. } | Drift::Changed { key, .. } => key,
    }
}
