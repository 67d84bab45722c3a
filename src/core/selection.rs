//! # Selection Store
//!
//! Owns the current selection (`build`), the baseline of the last applied
//! action (`last_build`) and the dependency graph. It is the only place where
//! any of them is mutated.
//!
//! A selection change is planned on scratch state first (including the full
//! cascade through nested dependents), then the pre-hook runs, then the plan is
//! committed in one step and the post-hook runs. Callers never observe a
//! half-applied cascade.
use crate::{
    core::{
        changeset,
        graph::DependencyGraph,
        hooks::{HookContext, HookDispatcher, HookError, HookPhase, HookSubject},
    },
    models::{
        ChangeCause, ChangeOutcome, OptionItem, ResolvedValues, Selection, SelectionChange,
    },
};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Unknown option '{name}'.")]
    UnknownOption { name: String },
    #[error("'{label}' is not a valid choice for option '{option}'.")]
    InvalidChoice { option: String, label: String },
    #[error("Option '{option}' has no valid choice while '{parent}' is '{parent_label}'.")]
    EmptyChoiceSet {
        option: String,
        parent: String,
        parent_label: String,
    },
    #[error("Pre-hook of option '{option}' aborted the change: {source}")]
    PreHook {
        option: String,
        #[source]
        source: HookError,
    },
    #[error("Post-hook of option '{option}' failed after the change was applied: {source}")]
    PostHook {
        option: String,
        #[source]
        source: HookError,
    },
}

type SelectionResult<T> = Result<T, SelectionError>;

/// The outcome of planning a change on scratch state.
struct CascadePlan {
    selection: Selection,
    valid_sets: Vec<(String, Vec<usize>)>,
    changes: Vec<SelectionChange>,
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    graph: DependencyGraph,
    build: Selection,
    last_build: Selection,
}

impl SelectionStore {
    /// Starts every option at its schema default.
    pub fn from_defaults(graph: DependencyGraph) -> SelectionResult<Self> {
        let build = graph.defaults();
        Self::with_selection(graph, build)
    }

    /// Starts from a persisted record, which becomes the baseline as well.
    ///
    /// The record is expected to have passed history validation. Keys the schema
    /// does not know are dropped and missing options take their default, so the
    /// store's key set always equals the schema's option names.
    pub fn restore(graph: DependencyGraph, record: Selection) -> SelectionResult<Self> {
        let mut build = graph.defaults();
        for (name, label) in record {
            match build.get_mut(&name) {
                Some(slot) => *slot = label,
                None => log::warn!("Ignoring unknown option '{}' in restored selection.", name),
            }
        }
        Self::with_selection(graph, build)
    }

    fn with_selection(graph: DependencyGraph, build: Selection) -> SelectionResult<Self> {
        let mut store = Self {
            graph,
            last_build: build.clone(),
            build,
        };
        store.reconcile()?;
        store.last_build = store.build.clone();
        Ok(store)
    }

    /// Recomputes the valid set of every dependent option parents-first and moves
    /// out-of-set labels to the first valid item.
    ///
    /// Mirrors what in-process changes produce: a `nested` parent filters its
    /// dependents by its selected label, any other parent never re-filters them
    /// and so filters by its default label.
    fn reconcile(&mut self) -> SelectionResult<()> {
        for name in self.graph.topological_order().to_vec() {
            let Some((parent, parent_label)) = self.filter_source(&name) else {
                continue;
            };
            let filtered = self.graph.filter_items(&name, &parent_label);
            self.graph.set_valid(&name, filtered);

            let current = self.build.get(&name).cloned().unwrap_or_default();
            if self.graph.is_valid_choice(&name, &current) {
                continue;
            }
            let first = self
                .graph
                .valid_items(&name)
                .first()
                .map(|item| item.label.clone())
                .ok_or_else(|| SelectionError::EmptyChoiceSet {
                    option: name.clone(),
                    parent: parent.clone(),
                    parent_label: parent_label.clone(),
                })?;
            log::warn!(
                "Option '{}' had '{}', which is not valid while '{}' is '{}'. Falling back to '{}'.",
                name,
                current,
                parent,
                parent_label,
                first
            );
            self.build.insert(name, first);
        }
        Ok(())
    }

    /// The parent of `name` and the label its valid set is filtered by.
    fn filter_source(&self, name: &str) -> Option<(String, String)> {
        let parent = self
            .graph
            .option(name)
            .and_then(|opt| opt.depends_on.as_deref())
            .and_then(|parent| self.graph.option(parent))?;
        let label = if parent.kind.cascades() {
            self.build.get(&parent.name).cloned().unwrap_or_default()
        } else {
            parent.default.clone()
        };
        Some((parent.name.clone(), label))
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The current selection.
    pub fn build(&self) -> &Selection {
        &self.build
    }

    /// The selection as of the last applied build or clean.
    pub fn last_build(&self) -> &Selection {
        &self.last_build
    }

    /// Option name -> value of the baseline's label, looked up in the full item list.
    pub fn baseline_values(&self) -> ResolvedValues {
        self.last_build
            .iter()
            .filter_map(|(name, label)| {
                self.graph
                    .option(name)
                    .and_then(|opt| opt.item(label))
                    .map(|item| (name.clone(), item.value.clone()))
            })
            .collect()
    }

    /// Replaces the baseline with a persisted one. The record must hold every option.
    pub fn adopt_baseline(&mut self, baseline: Selection) {
        if baseline.keys().eq(self.build.keys()) {
            self.last_build = baseline;
        } else {
            log::warn!("Ignoring a baseline that does not cover exactly the current options.");
        }
    }

    /// Makes the current selection the new baseline.
    pub fn commit_baseline(&mut self) {
        self.last_build = self.build.clone();
    }

    /// True if the selection changed since the last applied action.
    pub fn has_drifted(&self) -> bool {
        !changeset::equals(&self.build, &self.last_build)
    }

    /// The label currently selected for `name`.
    pub fn selection(&self, name: &str) -> SelectionResult<&str> {
        self.build
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SelectionError::UnknownOption {
                name: name.to_string(),
            })
    }

    pub fn valid_items(&self, name: &str) -> SelectionResult<Vec<&OptionItem>> {
        if !self.graph.contains(name) {
            return Err(SelectionError::UnknownOption {
                name: name.to_string(),
            });
        }
        Ok(self.graph.valid_items(name))
    }

    /// Option name -> value of the selected item among the currently valid items.
    /// An option whose label is not in its valid set is left out.
    pub fn resolved_values(&self) -> ResolvedValues {
        self.build
            .iter()
            .filter_map(|(name, label)| {
                self.graph
                    .valid_item(name, label)
                    .map(|item| (name.clone(), item.value.clone()))
            })
            .collect()
    }

    /// Selects `label` for `name` and cascades the change into dependents.
    ///
    /// Selecting the label that is already selected does nothing: no hooks run and
    /// no cascade is computed.
    pub fn set_selection(
        &mut self,
        name: &str,
        label: &str,
        hooks: &mut dyn HookDispatcher,
    ) -> SelectionResult<ChangeOutcome> {
        let current = self.selection(name)?.to_string();
        if current == label {
            log::debug!("'{}' is already '{}', nothing to do.", name, label);
            return Ok(ChangeOutcome::Unchanged);
        }
        if !self.graph.is_valid_choice(name, label) {
            return Err(SelectionError::InvalidChoice {
                option: name.to_string(),
                label: label.to_string(),
            });
        }

        let plan = self.plan(name, &current, label)?;
        let (pre_hook, post_hook) = self
            .graph
            .option(name)
            .map(|opt| (opt.pre_hook.clone(), opt.post_hook.clone()))
            .unwrap_or_default();
        let subject = HookSubject::OptionChange {
            option: name,
            previous: &current,
            next: label,
        };

        if let Some(hook) = pre_hook {
            let ctx = HookContext::new(HookPhase::Before, subject, &self.build);
            hooks
                .invoke(&hook, &ctx)
                .map_err(|source| SelectionError::PreHook {
                    option: name.to_string(),
                    source,
                })?;
        }

        // Commit.
        self.build = plan.selection;
        for (option, positions) in plan.valid_sets {
            self.graph.set_valid(&option, positions);
        }
        log::debug!(
            "Selection of '{}' changed to '{}' ({} cascaded)",
            name,
            label,
            plan.changes.len().saturating_sub(1)
        );

        if let Some(hook) = post_hook {
            let ctx = HookContext::new(HookPhase::After, subject, &self.build);
            hooks
                .invoke(&hook, &ctx)
                .map_err(|source| SelectionError::PostHook {
                    option: name.to_string(),
                    source,
                })?;
        }

        Ok(ChangeOutcome::Changed(plan.changes))
    }

    /// Computes the selection and valid sets that result from `name` becoming `label`.
    fn plan(&self, name: &str, previous: &str, label: &str) -> SelectionResult<CascadePlan> {
        let mut selection = self.build.clone();
        selection.insert(name.to_string(), label.to_string());

        let mut valid_sets = Vec::new();
        let mut changes = vec![SelectionChange {
            option: name.to_string(),
            previous: previous.to_string(),
            current: label.to_string(),
            cause: ChangeCause::Direct,
        }];

        let mut queue = VecDeque::new();
        if self
            .graph
            .option(name)
            .is_some_and(|opt| opt.kind.cascades())
        {
            queue.push_back(name.to_string());
        }

        while let Some(parent) = queue.pop_front() {
            let parent_label = selection.get(&parent).cloned().unwrap_or_default();
            for child in self.graph.dependents_of(&parent) {
                let Some(child_opt) = self.graph.option(child) else {
                    continue;
                };
                let filtered = self.graph.filter_items(child, &parent_label);
                let selected = selection.get(child).cloned().unwrap_or_default();
                let still_valid = filtered
                    .iter()
                    .filter_map(|&pos| child_opt.items.get(pos))
                    .any(|item| item.label == selected);

                if !still_valid {
                    let first = filtered
                        .first()
                        .and_then(|&pos| child_opt.items.get(pos))
                        .ok_or_else(|| SelectionError::EmptyChoiceSet {
                            option: child.clone(),
                            parent: parent.clone(),
                            parent_label: parent_label.clone(),
                        })?;
                    selection.insert(child.clone(), first.label.clone());
                    changes.push(SelectionChange {
                        option: child.clone(),
                        previous: selected,
                        current: first.label.clone(),
                        cause: ChangeCause::Cascade {
                            parent: parent.clone(),
                        },
                    });
                    if child_opt.kind.cascades() {
                        queue.push_back(child.clone());
                    }
                }
                valid_sets.push((child.clone(), filtered));
            }
        }

        Ok(CascadePlan {
            selection,
            valid_sets,
            changes,
        })
    }

    /// Returns every option to its schema default. The baseline is left alone.
    pub fn reset_to_defaults(&mut self) -> SelectionResult<()> {
        self.build = self.graph.defaults();
        self.reconcile()
    }
}
