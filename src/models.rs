// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- SCHEMA MODELS (What is read from the options and commands files) ---

/// One selectable value of an option.
///
/// Pure data: the presentation of an item (icons, tree nodes) belongs to the
/// view layer and never lives here.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OptionItem {
    pub label: String,
    pub value: String,
    /// Parent labels under which this item is a valid choice.
    #[serde(rename = "dependsArray", default, skip_serializing_if = "Option::is_none")]
    pub depends_array: Option<Vec<String>>,
}

impl OptionItem {
    /// Returns true if this item is a valid choice while the parent has `parent_label` selected.
    /// Items without a `dependsArray` are never valid for a dependent option.
    pub fn accepts(&self, parent_label: &str) -> bool {
        self.depends_array
            .as_ref()
            .is_some_and(|labels| labels.iter().any(|l| l == parent_label))
    }
}

/// The `type` tag of an option.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum OptionKind {
    /// A plain axis. Changing it never cascades.
    #[default]
    Root,
    /// A dependency-filter source for other options. Changing it never cascades.
    Node,
    /// Changing it recomputes the valid items of every dependent option.
    Nested,
}

impl OptionKind {
    /// The tags understood by the engine. Anything else behaves as `root`.
    pub const KNOWN_TAGS: &'static [&'static str] = &["root", "node", "nested"];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Root => "root",
            OptionKind::Node => "node",
            OptionKind::Nested => "nested",
        }
    }

    pub fn cascades(&self) -> bool {
        matches!(self, OptionKind::Nested)
    }
}

impl From<String> for OptionKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "node" => OptionKind::Node,
            "nested" => OptionKind::Nested,
            _ => OptionKind::Root,
        }
    }
}

impl From<OptionKind> for String {
    fn from(kind: OptionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A named configuration axis with a fixed, ordered set of items.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub name: String,
    /// Label of the item selected when no history exists.
    pub default: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(rename = "dependsOn", default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    pub items: Vec<OptionItem>,
    #[serde(rename = "preCmd", default, skip_serializing_if = "Option::is_none")]
    pub pre_hook: Option<String>,
    #[serde(rename = "postCmd", default, skip_serializing_if = "Option::is_none")]
    pub post_hook: Option<String>,
}

impl OptionDef {
    /// Finds an item by label in the full, unfiltered item list.
    pub fn item(&self, label: &str) -> Option<&OptionItem> {
        self.items.iter().find(|item| item.label == label)
    }
}

/// A named command template, e.g. `build` or `clean`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    pub name: String,
    /// Template string containing zero or more `{optionName}` tokens.
    #[serde(rename = "cmd")]
    pub template: String,
    /// `shell` (or any unknown tag) runs through the system shell; `process` runs the program directly.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "preCmd", default, skip_serializing_if = "Option::is_none")]
    pub pre_hook: Option<String>,
    #[serde(rename = "postCmd", default, skip_serializing_if = "Option::is_none")]
    pub post_hook: Option<String>,
}

impl CommandDef {
    pub fn invocation(&self) -> Invocation {
        match self.kind.as_str() {
            "process" => Invocation::Process,
            _ => Invocation::Shell,
        }
    }
}

/// How a rendered command line is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invocation {
    /// `sh -c` (`cmd /C` on Windows): operators, pipes, redirects and globs work.
    #[default]
    Shell,
    /// Split with shell-like quoting and exec'd directly, without a shell.
    Process,
}

// --- SELECTION MODELS ---

/// Option name -> label of the chosen item.
/// A `BTreeMap` keeps the persisted history and the CLI output in a stable order.
pub type Selection = BTreeMap<String, String>;

/// Option name -> value of the chosen item, as fed to the template renderer.
pub type ResolvedValues = BTreeMap<String, String>;

/// Why a selection changed during a `set_selection` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCause {
    /// The caller asked for it.
    Direct,
    /// A cascade forced it after `parent` changed.
    Cascade { parent: String },
}

/// A single accepted mutation of the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub option: String,
    pub previous: String,
    pub current: String,
    pub cause: ChangeCause,
}

/// Result of a selection request, handed to view collaborators as the
/// selection-change/refresh notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The requested label was already selected.
    Unchanged,
    /// The direct change first, then every cascaded change in application order.
    Changed(Vec<SelectionChange>),
}

impl ChangeOutcome {
    pub fn changes(&self) -> &[SelectionChange] {
        match self {
            ChangeOutcome::Unchanged => &[],
            ChangeOutcome::Changed(changes) => changes,
        }
    }
}

// --- WORKSPACE SETTINGS (What is read from `.buildopts/settings.toml`) ---

/// Raw, optional settings as written by the user. Every field falls back to a default.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub options_file: Option<String>,
    pub commands_file: Option<String>,
    pub history_file: Option<String>,
    pub baseline_file: Option<String>,
    pub clean_timeout_secs: Option<u64>,
    /// `0` disables the limit.
    pub build_timeout_secs: Option<u64>,
}
