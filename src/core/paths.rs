// src/core/paths.rs

use crate::constants::{BUILDOPTS_DIR, SETTINGS_FILENAME};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("Workspace root '{path}' is not accessible: {source}")]
    Root {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to expand path template '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Returns the canonical workspace root: `root` if given, the current directory otherwise.
pub fn resolve_workspace_root(root: Option<&Path>) -> Result<PathBuf, PathError> {
    let candidate = match root {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().map_err(PathError::CurrentDir)?,
    };
    dunce::canonicalize(&candidate).map_err(|e| PathError::Root {
        path: candidate.display().to_string(),
        source: e,
    })
}

/// Returns the path of the optional settings file of a workspace.
pub fn settings_path(root: &Path) -> PathBuf {
    root.join(BUILDOPTS_DIR).join(SETTINGS_FILENAME)
}

/// Expands a user-supplied path (home directory and environment variables) and
/// anchors it to the workspace root when it is relative.
///
/// # Arguments
/// * `root` - The canonical workspace root.
/// * `template` - The path as written in the settings (e.g., "~/builds/history.json").
pub fn resolve_in_workspace(root: &Path, template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    let path = PathBuf::from(expanded.into_owned());
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_relative_paths_are_anchored_to_root() {
        let root = Path::new("/work/space");
        let path = resolve_in_workspace(root, ".buildopts/options.json").unwrap();
        assert_eq!(path, root.join(".buildopts").join("options.json"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = tempdir().unwrap();
        let absolute = dir.path().join("history.json");
        let path = resolve_in_workspace(Path::new("/elsewhere"), &absolute.to_string_lossy()).unwrap();
        assert_eq!(path, absolute);
    }

    #[test]
    fn test_unknown_variable_fails_expansion() {
        let result = resolve_in_workspace(Path::new("/w"), "$BUILDOPTS_SURELY_UNDEFINED_VAR/x");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }

    #[test]
    fn test_resolve_workspace_root() {
        let dir = tempdir().unwrap();
        let root = resolve_workspace_root(Some(dir.path())).unwrap();
        assert_eq!(root, dunce::canonicalize(dir.path()).unwrap());

        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            resolve_workspace_root(Some(&missing)),
            Err(PathError::Root { .. })
        ));
    }
}
