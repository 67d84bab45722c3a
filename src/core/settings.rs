//! # Settings
//!
//! Resolves where a workspace keeps its schema and history files, and how long
//! the build/clean workflow may wait on a command. Everything can be overridden
//! in `.buildopts/settings.toml`; an absent file means all defaults.
use crate::{
    constants::{
        BASELINE_FILENAME, BUILDOPTS_DIR, COMMANDS_FILENAME, DEFAULT_CLEAN_TIMEOUT_SECS, HISTORY_FILENAME,
        OPTIONS_FILENAME,
    },
    core::paths::{self, PathError},
    models::SettingsFile,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("`clean_timeout_secs` must be greater than zero.")]
    ZeroCleanTimeout,
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Fully resolved settings of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub root: PathBuf,
    pub options_file: PathBuf,
    pub commands_file: PathBuf,
    pub history_file: PathBuf,
    /// Where the last applied selection is kept between runs.
    pub baseline_file: PathBuf,
    /// How long a `build` waits for the `clean` it depends on.
    pub clean_timeout: Duration,
    /// `None` lets a build run for as long as it needs.
    pub build_timeout: Option<Duration>,
}

impl Settings {
    /// Loads `.buildopts/settings.toml` from `root` if present and fills in defaults.
    pub fn load(root: &Path) -> Result<Self, SettingsError> {
        let path = paths::settings_path(root);
        let file = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| SettingsError::Parse {
                path: path.display().to_string(),
                source: e,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No settings file at '{}', using defaults.", path.display());
                SettingsFile::default()
            }
            Err(e) => {
                return Err(SettingsError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        Self::from_file(root, file)
    }

    /// Resolves raw settings against the workspace root.
    pub fn from_file(root: &Path, file: SettingsFile) -> Result<Self, SettingsError> {
        let default_path = |name: &str| format!("{}/{}", BUILDOPTS_DIR, name);
        let resolve = |value: Option<String>, name: &str| {
            paths::resolve_in_workspace(root, &value.unwrap_or_else(|| default_path(name)))
        };

        let clean_timeout_secs = file.clean_timeout_secs.unwrap_or(DEFAULT_CLEAN_TIMEOUT_SECS);
        if clean_timeout_secs == 0 {
            return Err(SettingsError::ZeroCleanTimeout);
        }

        let settings = Self {
            root: root.to_path_buf(),
            options_file: resolve(file.options_file, OPTIONS_FILENAME)?,
            commands_file: resolve(file.commands_file, COMMANDS_FILENAME)?,
            history_file: resolve(file.history_file, HISTORY_FILENAME)?,
            baseline_file: resolve(file.baseline_file, BASELINE_FILENAME)?,
            clean_timeout: Duration::from_secs(clean_timeout_secs),
            build_timeout: file
                .build_timeout_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        };
        log::debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}
