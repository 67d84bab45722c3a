//! # History
//!
//! Persists the current selection as a flat JSON object (option name -> label)
//! and validates a persisted record against the current schema before it is
//! accepted. Acceptance is all-or-nothing: a record with an unknown key, a
//! missing option or a label that no longer exists is discarded whole.
//!
//! Saving only writes the file. Advancing the comparison baseline is a
//! separate call on the selection store.
use crate::models::{OptionDef, Selection};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Could not write history file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a persisted record was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryInvalid {
    #[error("the record is not a JSON object")]
    NotAnObject,
    #[error("'{key}' is not an option of the current schema")]
    UnknownKey { key: String },
    #[error("option '{option}' is missing from the record")]
    MissingOption { option: String },
    #[error("'{label}' is not an item of option '{option}'")]
    UnknownLabel { option: String, label: String },
    #[error("the value of option '{option}' is not a string")]
    NotAString { option: String },
}

/// The result of reading a persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLoad {
    /// No record, or one that could not be read or parsed.
    Absent,
    /// A record that does not match the current schema.
    Invalid(HistoryInvalid),
    Valid(Selection),
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the record with `selection`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so a
    /// crash never leaves a truncated record behind.
    pub fn save(&self, selection: &Selection) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(selection)?;
        let write_err = |source: std::io::Error| HistoryError::Write {
            path: self.path.display().to_string(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::debug!("History saved to '{}'", self.path.display());
        Ok(())
    }

    /// Reads the raw document. Missing, unreadable and malformed files are all `None`.
    pub fn load(&self) -> Option<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("No readable history at '{}': {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "History file '{}' is not valid JSON ({}), ignoring it.",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Reads the record and checks it against `options`.
    pub fn load_and_validate(&self, options: &[OptionDef]) -> HistoryLoad {
        let Some(document) = self.load() else {
            return HistoryLoad::Absent;
        };
        let checked = match &document {
            Value::Object(record) => validate(record, options),
            _ => Err(HistoryInvalid::NotAnObject),
        };
        match checked {
            Ok(selection) => HistoryLoad::Valid(selection),
            Err(reason) => {
                log::warn!(
                    "Discarding history '{}': {}.",
                    self.path.display(),
                    reason
                );
                HistoryLoad::Invalid(reason)
            }
        }
    }
}

/// Checks a raw record against the full, unfiltered item lists of `options`.
pub fn validate(
    record: &Map<String, Value>,
    options: &[OptionDef],
) -> Result<Selection, HistoryInvalid> {
    for key in record.keys() {
        if !options.iter().any(|opt| &opt.name == key) {
            return Err(HistoryInvalid::UnknownKey { key: key.clone() });
        }
    }

    let mut selection = Selection::new();
    for opt in options {
        let label = match record.get(&opt.name) {
            None => {
                return Err(HistoryInvalid::MissingOption {
                    option: opt.name.clone(),
                });
            }
            Some(Value::String(label)) => label,
            Some(_) => {
                return Err(HistoryInvalid::NotAString {
                    option: opt.name.clone(),
                });
            }
        };
        if opt.item(label).is_none() {
            return Err(HistoryInvalid::UnknownLabel {
                option: opt.name.clone(),
                label: label.clone(),
            });
        }
        selection.insert(opt.name.clone(), label.clone());
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OptionItem, OptionKind};
    use tempfile::tempdir;

    fn options() -> Vec<OptionDef> {
        let item = |label: &str, depends: Option<Vec<String>>| OptionItem {
            label: label.to_string(),
            value: label.to_string(),
            depends_array: depends,
        };
        vec![
            OptionDef {
                name: "arch".to_string(),
                default: "x86".to_string(),
                kind: OptionKind::Nested,
                depends_on: None,
                items: vec![item("x86", None), item("arm", None)],
                pre_hook: None,
                post_hook: None,
            },
            OptionDef {
                name: "mode".to_string(),
                default: "fast".to_string(),
                kind: OptionKind::Node,
                depends_on: Some("arch".to_string()),
                items: vec![
                    item("fast", Some(vec!["x86".to_string()])),
                    item("safe", Some(vec!["arm".to_string(), "x86".to_string()])),
                ],
                pre_hook: None,
                post_hook: None,
            },
        ]
    }

    fn selection(pairs: &[(&str, &str)]) -> Selection {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.json"));
        let build = selection(&[("arch", "arm"), ("mode", "safe")]);

        store.save(&build).unwrap();
        assert_eq!(store.load_and_validate(&options()), HistoryLoad::Valid(build));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        store.save(&selection(&[("arch", "arm"), ("mode", "safe")])).unwrap();
        store.save(&selection(&[("arch", "x86"), ("mode", "fast")])).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, serde_json::json!({ "arch": "x86", "mode": "fast" }));
    }

    #[test]
    fn test_missing_and_malformed_are_absent() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert_eq!(store.load_and_validate(&options()), HistoryLoad::Absent);

        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load_and_validate(&options()), HistoryLoad::Absent);

    }

    #[test]
    fn test_non_object_record_is_invalid() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        fs::write(store.path(), "[1, 2]").unwrap();
        assert_eq!(
            store.load_and_validate(&options()),
            HistoryLoad::Invalid(HistoryInvalid::NotAnObject)
        );
    }

    #[test]
    fn test_renamed_option_invalidates_whole_record() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        fs::write(
            store.path(),
            r#"{ "arch": "arm", "mode": "safe", "flavour": "mild" }"#,
        )
        .unwrap();
        assert_eq!(
            store.load_and_validate(&options()),
            HistoryLoad::Invalid(HistoryInvalid::UnknownKey {
                key: "flavour".to_string()
            })
        );
    }

    #[test]
    fn test_validate_rejections() {
        let record = |json: Value| json.as_object().cloned().unwrap();

        assert_eq!(
            validate(&record(serde_json::json!({ "arch": "arm" })), &options()),
            Err(HistoryInvalid::MissingOption {
                option: "mode".to_string()
            })
        );
        assert_eq!(
            validate(
                &record(serde_json::json!({ "arch": "mips", "mode": "safe" })),
                &options()
            ),
            Err(HistoryInvalid::UnknownLabel {
                option: "arch".to_string(),
                label: "mips".to_string()
            })
        );
        assert_eq!(
            validate(
                &record(serde_json::json!({ "arch": 1, "mode": "safe" })),
                &options()
            ),
            Err(HistoryInvalid::NotAString {
                option: "arch".to_string()
            })
        );
    }

    #[test]
    fn test_validation_ignores_dependency_filter() {
        // `fast` is not valid while arch is arm, but it is an item of `mode`.
        let record = serde_json::json!({ "arch": "arm", "mode": "fast" });
        let result = validate(record.as_object().unwrap(), &options());
        assert_eq!(result, Ok(selection(&[("arch", "arm"), ("mode", "fast")])));
    }
}
