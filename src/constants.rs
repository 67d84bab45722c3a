// src/constants.rs

/// The name of the directory containing buildopts files inside a workspace.
pub const BUILDOPTS_DIR: &str = ".buildopts";

/// The name of the optional settings file (inside .buildopts/).
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// The default name of the options schema file (inside .buildopts/).
pub const OPTIONS_FILENAME: &str = "options.json";

/// The default name of the commands schema file (inside .buildopts/).
pub const COMMANDS_FILENAME: &str = "commands.json";

/// The default name of the persisted selection (inside .buildopts/).
pub const HISTORY_FILENAME: &str = "history.json";

/// The default name of the selection as of the last applied build or clean (inside .buildopts/).
pub const BASELINE_FILENAME: &str = "last_build.json";

/// The command rendered and run by `build`.
pub const BUILD_COMMAND: &str = "build";

/// The command rendered and run by `clean`.
pub const CLEAN_COMMAND: &str = "clean";

/// Upper bound for waiting on a `clean` before the dependent `build` is abandoned.
pub const DEFAULT_CLEAN_TIMEOUT_SECS: u64 = 600;
