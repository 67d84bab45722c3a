//! # Session
//!
//! Wires the option engine to a workspace: loads the schema, restores or
//! recreates the persisted selection, and implements the build/clean
//! workflow. A `build` whose selection drifted from the last applied one runs
//! `clean` first and only starts once that clean has completed; the wait is
//! bounded by the clean timeout from the settings.
//!
//! Process execution stays behind the [`TaskRunner`] seam.
use crate::{
    constants::{BUILD_COMMAND, CLEAN_COMMAND},
    core::{
        graph::{DependencyGraph, GraphError},
        history::{HistoryError, HistoryLoad, HistoryStore},
        hooks::{HookContext, HookDispatcher, HookError, HookPhase, HookSubject},
        schema::{Schema, SchemaError},
        selection::{SelectionError, SelectionStore},
        settings::{Settings, SettingsError},
        template,
    },
    models::{ChangeOutcome, CommandDef, Invocation, ResolvedValues},
    system::executor::ExecutionError,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Invalid options schema: {0}")]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("Command '{name}' is not defined in the commands file.")]
    MissingCommand { name: String },
    #[error("The {phase}-hook of command '{command}' failed: {source}")]
    CommandHook {
        command: String,
        phase: HookPhase,
        #[source]
        source: HookError,
    },
    #[error("Task '{command}' failed: {source}")]
    Task {
        command: String,
        #[source]
        source: ExecutionError,
    },
    #[error("The selection changed since the last build and the required clean failed: {source}")]
    CleanBeforeBuild {
        #[source]
        source: Box<SessionError>,
    },
}

impl SessionError {
    /// True if the error comes from a task the user interrupted.
    pub fn is_cancellation(&self) -> bool {
        match self {
            SessionError::Task {
                source: ExecutionError::Cancelled,
                ..
            } => true,
            SessionError::CleanBeforeBuild { source } => source.is_cancellation(),
            _ => false,
        }
    }
}

type SessionResult<T> = Result<T, SessionError>;

/// A rendered command handed to the task-execution collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub name: String,
    pub command_line: String,
    pub invocation: Invocation,
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

/// Runs a task to completion. Returning is the completion signal.
pub trait TaskRunner {
    fn run(&mut self, task: &TaskRequest) -> Result<(), ExecutionError>;
}

/// What a `build` request ended up running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The rendered clean command, if the selection had drifted.
    pub cleaned: Option<String>,
    pub built: String,
}

/// How the starting selection was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    Restored,
    Defaults,
}

#[derive(Debug)]
pub struct Session {
    settings: Settings,
    schema: Schema,
    store: SelectionStore,
    history: HistoryStore,
    baseline: HistoryStore,
    start_state: StartState,
    warnings: Vec<String>,
}

impl Session {
    /// Loads a workspace. Schema problems are fatal; history problems are not.
    pub fn open(settings: Settings) -> SessionResult<Self> {
        let schema = Schema::load(&settings.options_file, &settings.commands_file)?;
        let graph = DependencyGraph::build(schema.options.clone())?;
        let history = HistoryStore::new(settings.history_file.clone());
        let baseline = HistoryStore::new(settings.baseline_file.clone());
        let mut warnings = Vec::new();

        let restored = match history.load_and_validate(&schema.options) {
            HistoryLoad::Valid(record) => {
                match SelectionStore::restore(graph.clone(), record.clone()) {
                    Ok(store) => Some((store, record)),
                    Err(e) => {
                        log::warn!("Could not restore history, using defaults: {}", e);
                        None
                    }
                }
            }
            HistoryLoad::Invalid(reason) => {
                log::info!("History does not match the current options ({}).", reason);
                None
            }
            HistoryLoad::Absent => None,
        };

        let (mut store, start_state) = match restored {
            Some((store, record)) => {
                if store.build() != &record {
                    save_best_effort(&history, &store, &mut warnings);
                }
                (store, StartState::Restored)
            }
            None => {
                let store = SelectionStore::from_defaults(graph)?;
                save_best_effort(&history, &store, &mut warnings);
                (store, StartState::Defaults)
            }
        };

        if let HistoryLoad::Valid(record) = baseline.load_and_validate(&schema.options) {
            store.adopt_baseline(record);
        }

        Ok(Self {
            settings,
            schema,
            store,
            history,
            baseline,
            start_state,
            warnings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn start_state(&self) -> StartState {
        self.start_state
    }

    /// Non-fatal problems met while opening the session.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Changes a selection and persists the result if anything changed.
    pub fn select(
        &mut self,
        option: &str,
        label: &str,
        hooks: &mut dyn HookDispatcher,
    ) -> SessionResult<ChangeOutcome> {
        let before = self.store.build().clone();
        let result = self.store.set_selection(option, label, hooks);
        // A failing post-hook still leaves an applied change behind.
        if self.store.build() != &before {
            self.history.save(self.store.build())?;
        }
        Ok(result?)
    }

    /// Returns every option to its default and persists that.
    pub fn reset(&mut self) -> SessionResult<()> {
        self.store.reset_to_defaults()?;
        self.history.save(self.store.build())?;
        Ok(())
    }

    /// Renders a command template with the values of the current selection.
    pub fn render(&self, command: &str) -> SessionResult<String> {
        self.render_with(command, &self.store.resolved_values())
    }

    fn render_with(&self, command: &str, values: &ResolvedValues) -> SessionResult<String> {
        let template_str =
            self.schema
                .command_template(command)
                .ok_or_else(|| SessionError::MissingCommand {
                    name: command.to_string(),
                })?;
        Ok(template::render(template_str, values))
    }

    /// Runs `clean` for the last applied selection and makes the current selection the baseline.
    pub fn clean(
        &mut self,
        runner: &mut dyn TaskRunner,
        hooks: &mut dyn HookDispatcher,
    ) -> SessionResult<String> {
        let rendered = self.render_with(CLEAN_COMMAND, &self.store.baseline_values())?;
        self.run_command(
            CLEAN_COMMAND,
            &rendered,
            Some(self.settings.clean_timeout),
            runner,
            hooks,
        )?;
        self.store.commit_baseline();
        self.persist_baseline();
        Ok(rendered)
    }

    /// Runs `build`, preceded by a `clean` when the selection drifted.
    pub fn build(
        &mut self,
        runner: &mut dyn TaskRunner,
        hooks: &mut dyn HookDispatcher,
    ) -> SessionResult<BuildReport> {
        let cleaned = if self.store.has_drifted() {
            log::info!("Selection changed since the last build, cleaning first.");
            let rendered = self
                .clean(runner, hooks)
                .map_err(|e| SessionError::CleanBeforeBuild {
                    source: Box::new(e),
                })?;
            Some(rendered)
        } else {
            None
        };

        self.history.save(self.store.build())?;
        let built = self.render(BUILD_COMMAND)?;
        self.run_command(
            BUILD_COMMAND,
            &built,
            self.settings.build_timeout,
            runner,
            hooks,
        )?;
        self.store.commit_baseline();
        self.persist_baseline();
        Ok(BuildReport { cleaned, built })
    }

    fn run_command(
        &self,
        name: &str,
        rendered: &str,
        timeout: Option<Duration>,
        runner: &mut dyn TaskRunner,
        hooks: &mut dyn HookDispatcher,
    ) -> SessionResult<()> {
        let command = self.schema.command(name);
        let (pre_hook, post_hook) = command
            .map(|cmd| (cmd.pre_hook.clone(), cmd.post_hook.clone()))
            .unwrap_or_default();
        let invocation = command.map(CommandDef::invocation).unwrap_or_default();
        if let Some(hook) = &pre_hook {
            self.invoke_command_hook(hooks, hook, HookPhase::Before, name, rendered)?;
        }

        let task = TaskRequest {
            name: name.to_string(),
            command_line: rendered.to_string(),
            invocation,
            cwd: self.settings.root.clone(),
            timeout,
        };
        runner.run(&task).map_err(|source| SessionError::Task {
            command: name.to_string(),
            source,
        })?;

        if let Some(hook) = &post_hook {
            self.invoke_command_hook(hooks, hook, HookPhase::After, name, rendered)?;
        }
        Ok(())
    }

    fn persist_baseline(&self) {
        if let Err(e) = self.baseline.save(self.store.last_build()) {
            log::warn!("Could not record the applied selection: {}", e);
        }
    }

    fn invoke_command_hook(
        &self,
        hooks: &mut dyn HookDispatcher,
        hook: &str,
        phase: HookPhase,
        name: &str,
        rendered: &str,
    ) -> SessionResult<()> {
        let subject = HookSubject::Command { name, rendered };
        let ctx = HookContext::new(phase, subject, self.store.build());
        hooks
            .invoke(hook, &ctx)
            .map_err(|source| SessionError::CommandHook {
                command: name.to_string(),
                phase,
                source,
            })
    }
}

fn save_best_effort(history: &HistoryStore, store: &SelectionStore, warnings: &mut Vec<String>) {
    if let Err(e) = history.save(store.build()) {
        log::warn!("{}", e);
        warnings.push(format!("Could not create history file: {}", e));
    }
}
