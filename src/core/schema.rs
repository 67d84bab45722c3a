//! # Schema Loader
//!
//! Parses the raw options and commands files into typed schema objects. The
//! structural checks run on the untyped JSON first so that a failure can name
//! the offending file and record; only a structurally valid document is then
//! decoded with `serde`. There is no partial schema: any error aborts the load.
//!
//! Semantic cross-checks (`dependsOn` targets, defaults, cycles) belong to the
//! dependency graph builder, not to this module.
use crate::models::{CommandDef, OptionDef, OptionKind};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Could not locate {kind} file at '{path}'.")]
    MissingFile { kind: &'static str, path: String },
    #[error("Could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{file}' is not valid JSON: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Incorrect format of '{file}': expected a JSON array of records.")]
    NotAnArray { file: String },
    #[error("Incorrect format of '{file}': the array must not be empty.")]
    Empty { file: String },
    #[error("Incorrect format of '{file}', record #{index}: {reason}")]
    InvalidRecord {
        file: String,
        index: usize,
        reason: String,
    },
    #[error("Incorrect format of '{file}', record #{index}: command '{name}' is already defined.")]
    DuplicateCommand {
        file: String,
        index: usize,
        name: String,
    },
    #[error("Failed to decode '{file}': {source}")]
    Decode {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

type SchemaResult<T> = Result<T, SchemaError>;

/// The validated, read-only schema of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub options: Vec<OptionDef>,
    pub commands: Vec<CommandDef>,
}

impl Schema {
    /// Reads and validates both schema files. A missing file is fatal.
    pub fn load(options_path: &Path, commands_path: &Path) -> SchemaResult<Self> {
        let options_json = read_schema_file("options", options_path)?;
        let commands_json = read_schema_file("commands", commands_path)?;

        let file_name = |p: &Path| p.display().to_string();
        let options = parse_options(&file_name(options_path), &options_json)?;
        let commands = parse_commands(&file_name(commands_path), &commands_json)?;

        log::debug!(
            "Schema loaded: {} options from '{}', {} commands from '{}'",
            options.len(),
            options_path.display(),
            commands.len(),
            commands_path.display()
        );
        Ok(Self { options, commands })
    }

    pub fn command(&self, name: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|cmd| cmd.name == name)
    }

    /// Returns the template of a command, or `None` if the workspace does not define it.
    pub fn command_template(&self, name: &str) -> Option<&str> {
        self.command(name).map(|cmd| cmd.template.as_str())
    }
}

fn read_schema_file(kind: &'static str, path: &Path) -> SchemaResult<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            SchemaError::MissingFile {
                kind,
                path: path.display().to_string(),
            }
        } else {
            SchemaError::Read {
                path: path.display().to_string(),
                source: e,
            }
        }
    })
}

/// Parses and validates the contents of an options file.
pub fn parse_options(file: &str, json: &str) -> SchemaResult<Vec<OptionDef>> {
    let value = parse_json(file, json)?;
    let records = non_empty_array(file, &value)?;

    for (index, record) in records.iter().enumerate() {
        let invalid = |reason: String| SchemaError::InvalidRecord {
            file: file.to_string(),
            index,
            reason,
        };
        let obj = record
            .as_object()
            .ok_or_else(|| invalid("expected an object".to_string()))?;

        for field in ["name", "default", "type"] {
            require_string(obj, field).map_err(invalid)?;
        }
        optional_string(obj, "dependsOn").map_err(invalid)?;
        optional_string(obj, "preCmd").map_err(invalid)?;
        optional_string(obj, "postCmd").map_err(invalid)?;

        let items = match obj.get("items") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(invalid("`items` must be a non-empty array".to_string())),
        };
        for (item_index, item) in items.iter().enumerate() {
            validate_item(item)
                .map_err(|reason| invalid(format!("item #{}: {}", item_index, reason)))?;
        }

        if let Some(Value::String(tag)) = obj.get("type") {
            if !OptionKind::KNOWN_TAGS.contains(&tag.as_str()) {
                log::warn!(
                    "'{}', record #{}: unknown option type '{}', treating it as 'root'.",
                    file,
                    index,
                    tag
                );
            }
        }
    }

    serde_json::from_value(value).map_err(|e| SchemaError::Decode {
        file: file.to_string(),
        source: e,
    })
}

/// Parses and validates the contents of a commands file.
pub fn parse_commands(file: &str, json: &str) -> SchemaResult<Vec<CommandDef>> {
    let value = parse_json(file, json)?;
    let records = non_empty_array(file, &value)?;
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let invalid = |reason: String| SchemaError::InvalidRecord {
            file: file.to_string(),
            index,
            reason,
        };
        let obj = record
            .as_object()
            .ok_or_else(|| invalid("expected an object".to_string()))?;
        for field in ["name", "cmd", "type"] {
            require_string(obj, field).map_err(invalid)?;
        }
        optional_string(obj, "preCmd").map_err(invalid)?;
        optional_string(obj, "postCmd").map_err(invalid)?;

        // Lookups take the first match, so a second definition would be dead.
        if let Some(Value::String(name)) = obj.get("name") {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateCommand {
                    file: file.to_string(),
                    index,
                    name: name.clone(),
                });
            }
        }
    }

    serde_json::from_value(value).map_err(|e| SchemaError::Decode {
        file: file.to_string(),
        source: e,
    })
}

fn parse_json(file: &str, json: &str) -> SchemaResult<Value> {
    serde_json::from_str(json).map_err(|e| SchemaError::Parse {
        file: file.to_string(),
        source: e,
    })
}

fn non_empty_array<'v>(file: &str, value: &'v Value) -> SchemaResult<&'v Vec<Value>> {
    let records = value.as_array().ok_or_else(|| SchemaError::NotAnArray {
        file: file.to_string(),
    })?;
    if records.is_empty() {
        return Err(SchemaError::Empty {
            file: file.to_string(),
        });
    }
    Ok(records)
}

fn validate_item(item: &Value) -> Result<(), String> {
    let obj = item.as_object().ok_or("expected an object")?;
    require_string(obj, "label")?;
    require_string(obj, "value")?;
    match obj.get("dependsArray") {
        None => Ok(()),
        Some(Value::Array(labels)) if labels.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err("`dependsArray` must be an array of strings".to_string()),
    }
}

fn require_string(obj: &Map<String, Value>, field: &str) -> Result<(), String> {
    match obj.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("`{}` must be a string", field)),
        None => Err(format!("missing string field `{}`", field)),
    }
}

fn optional_string(obj: &Map<String, Value>, field: &str) -> Result<(), String> {
    match obj.get(field) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("`{}` must be a string when present", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    const OPTIONS: &str = r#"[
        { "name": "arch", "default": "x86", "type": "nested",
          "items": [ { "label": "x86", "value": "x86_64" }, { "label": "arm", "value": "aarch64" } ] },
        { "name": "mode", "default": "fast", "type": "node", "dependsOn": "arch", "preCmd": "log",
          "items": [ { "label": "fast", "value": "fast", "dependsArray": ["x86"] },
                     { "label": "safe", "value": "safe", "dependsArray": ["arm", "x86"] } ] }
    ]"#;

    const COMMANDS: &str = r#"[
        { "name": "build", "cmd": "make ARCH={arch} MODE={mode}", "type": "shell" },
        { "name": "clean", "cmd": "make clean", "type": "shell", "postCmd": "echo" }
    ]"#;

    #[test]
    fn test_parse_options_success() {
        let options = parse_options("options.json", OPTIONS).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].kind, OptionKind::Nested);
        assert_eq!(options[1].depends_on.as_deref(), Some("arch"));
        assert_eq!(options[1].pre_hook.as_deref(), Some("log"));
        assert_eq!(
            options[1].items[1].depends_array,
            Some(vec!["arm".to_string(), "x86".to_string()])
        );
        assert!(options[0].items[0].depends_array.is_none());
    }

    #[test]
    fn test_parse_commands_success() {
        let commands = parse_commands("commands.json", COMMANDS).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].template, "make ARCH={arch} MODE={mode}");
        assert_eq!(commands[1].post_hook.as_deref(), Some("echo"));
    }

    #[test]
    fn test_unknown_type_tag_behaves_as_root() {
        let json = r#"[{ "name": "a", "default": "1", "type": "weird",
                         "items": [{ "label": "1", "value": "1" }] }]"#;
        let options = parse_options("options.json", json).unwrap();
        assert_eq!(options[0].kind, OptionKind::Root);
    }

    #[test]
    fn test_rejects_empty_and_non_array() {
        assert!(matches!(
            parse_options("options.json", "[]"),
            Err(SchemaError::Empty { .. })
        ));
        assert!(matches!(
            parse_commands("commands.json", r#"{"name": "build"}"#),
            Err(SchemaError::NotAnArray { .. })
        ));
        assert!(matches!(
            parse_options("options.json", "not json"),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn test_rejects_option_without_items() {
        let json = r#"[
            { "name": "a", "default": "1", "type": "root", "items": [{ "label": "1", "value": "1" }] },
            { "name": "b", "default": "1", "type": "root", "items": [] }
        ]"#;
        let err = parse_options("options.json", json).unwrap_err();
        assert!(matches!(
            &err,
            SchemaError::InvalidRecord { file, index: 1, reason }
                if file == "options.json" && reason.contains("items")
        ));
    }

    #[test]
    fn test_rejects_item_with_non_string_value() {
        let json = r#"[{ "name": "a", "default": "1", "type": "root",
                         "items": [{ "label": "1", "value": 1 }] }]"#;
        let err = parse_options("options.json", json).unwrap_err();
        assert!(err.to_string().contains("item #0"));
        assert!(err.to_string().contains("`value` must be a string"));
    }

    #[test]
    fn test_rejects_command_missing_cmd() {
        let json = r#"[{ "name": "build", "type": "shell" }]"#;
        let err = parse_commands("commands.json", json).unwrap_err();
        assert!(err.to_string().contains("missing string field `cmd`"));
    }

    #[test]
    fn test_rejects_duplicate_command_names() {
        let json = r#"[
            { "name": "build", "cmd": "make", "type": "shell" },
            { "name": "clean", "cmd": "make clean", "type": "shell" },
            { "name": "build", "cmd": "ninja", "type": "shell" }
        ]"#;
        let err = parse_commands("commands.json", json).unwrap_err();
        assert!(matches!(
            &err,
            SchemaError::DuplicateCommand { index: 2, name, .. } if name == "build"
        ));
        assert!(err.to_string().contains("'build' is already defined"));
    }

    #[test]
    fn test_rejects_non_string_depends_on() {
        let json = r#"[{ "name": "a", "default": "1", "type": "node", "dependsOn": 3,
                         "items": [{ "label": "1", "value": "1" }] }]"#;
        assert!(matches!(
            parse_options("options.json", json),
            Err(SchemaError::InvalidRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let mut options_file = NamedTempFile::new_in(dir.path()).unwrap();
        options_file.write_all(OPTIONS.as_bytes()).unwrap();

        let result = Schema::load(options_file.path(), &dir.path().join("commands.json"));
        assert!(matches!(
            result,
            Err(SchemaError::MissingFile { kind: "commands", .. })
        ));
    }

    #[test]
    fn test_load_and_lookup_commands() {
        let mut options_file = NamedTempFile::new().unwrap();
        options_file.write_all(OPTIONS.as_bytes()).unwrap();
        let mut commands_file = NamedTempFile::new().unwrap();
        commands_file.write_all(COMMANDS.as_bytes()).unwrap();

        let schema = Schema::load(options_file.path(), commands_file.path()).unwrap();
        assert_eq!(schema.command_template("clean"), Some("make clean"));
        assert_eq!(schema.command_template("deploy"), None);
        assert!(schema.options.iter().any(|opt| opt.name == "mode"));
    }
}
