//! # Hooks
//!
//! Options and commands may name a `preCmd`/`postCmd` hook. A hook name is
//! never evaluated as source code: it is looked up in a [`HookRegistry`] of
//! callbacks registered by the host, and the callback only receives a
//! read-only [`HookContext`].
use crate::models::Selection;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A host callback bound to a hook name.
pub type HookFn = Box<dyn FnMut(&HookContext<'_>) -> Result<(), BoxError>>;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Hook '{name}' is not registered.")]
    Unknown { name: String },
    #[error("Hook '{name}' failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => f.write_str("before"),
            HookPhase::After => f.write_str("after"),
        }
    }
}

/// What a hook is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSubject<'a> {
    OptionChange {
        option: &'a str,
        previous: &'a str,
        next: &'a str,
    },
    Command {
        name: &'a str,
        rendered: &'a str,
    },
}

/// The only view of the engine a hook gets: the event and a read-only selection.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub phase: HookPhase,
    pub subject: HookSubject<'a>,
    selection: &'a Selection,
}

impl<'a> HookContext<'a> {
    pub fn new(phase: HookPhase, subject: HookSubject<'a>, selection: &'a Selection) -> Self {
        Self {
            phase,
            subject,
            selection,
        }
    }

    /// The label currently selected for `option`.
    pub fn selection(&self, option: &str) -> Option<&'a str> {
        self.selection.get(option).map(String::as_str)
    }

    /// A one-line description of the event, used by the built-in hooks.
    pub fn describe(&self) -> String {
        match self.subject {
            HookSubject::OptionChange {
                option,
                previous,
                next,
            } => format!("[{}] {}: {} -> {}", self.phase, option, previous, next),
            HookSubject::Command { name, rendered } => {
                format!("[{}] {}: {}", self.phase, name, rendered)
            }
        }
    }
}

/// The seam between the engine and whatever runs hooks.
pub trait HookDispatcher {
    fn invoke(&mut self, hook: &str, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// Accepts every hook and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HookDispatcher for NoHooks {
    fn invoke(&mut self, hook: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        log::trace!("Hooks disabled, skipping '{}' {}", hook, ctx.describe());
        Ok(())
    }
}

/// Named callbacks registered by the host.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<String, HookFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the hooks every workspace can reference:
    /// - `log`: writes the event to the log at info level.
    /// - `echo`: prints the event to stdout.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", |ctx| {
            log::info!("hook {}", ctx.describe());
            Ok(())
        });
        registry.register("echo", |ctx| {
            println!("{}", ctx.describe());
            Ok(())
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnMut(&HookContext<'_>) -> Result<(), BoxError> + 'static,
    {
        self.hooks.insert(name.into(), Box::new(hook));
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

impl HookDispatcher for HookRegistry {
    fn invoke(&mut self, hook: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let callback = self.hooks.get_mut(hook).ok_or_else(|| HookError::Unknown {
            name: hook.to_string(),
        })?;
        log::debug!("Running hook '{}' {}", hook, ctx.describe());
        callback(ctx).map_err(|source| HookError::Failed {
            name: hook.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn selection() -> Selection {
        [("arch".to_string(), "arm".to_string())].into_iter().collect()
    }

    #[test]
    fn test_registry_invokes_named_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut registry = HookRegistry::new();
        registry.register("record", move |ctx| {
            sink.borrow_mut()
                .push((ctx.describe(), ctx.selection("arch").map(str::to_string)));
            Ok(())
        });

        let sel = selection();
        let ctx = HookContext::new(
            HookPhase::Before,
            HookSubject::OptionChange {
                option: "arch",
                previous: "x86",
                next: "arm",
            },
            &sel,
        );
        registry.invoke("record", &ctx).unwrap();

        assert_eq!(
            seen.borrow().as_slice(),
            &[("[before] arch: x86 -> arm".to_string(), Some("arm".to_string()))]
        );
    }

    #[test]
    fn test_unknown_hook_is_an_error() {
        let mut registry = HookRegistry::with_builtins();
        let sel = selection();
        let ctx = HookContext::new(
            HookPhase::After,
            HookSubject::Command {
                name: "build",
                rendered: "make",
            },
            &sel,
        );
        assert!(registry.invoke("log", &ctx).is_ok());
        assert!(matches!(
            registry.invoke("rm -rf /", &ctx),
            Err(HookError::Unknown { .. })
        ));
    }

    #[test]
    fn test_failing_callback_is_reported() {
        let mut registry = HookRegistry::new();
        registry.register("boom", |_| Err("exploded".into()));
        let sel = selection();
        let ctx = HookContext::new(
            HookPhase::Before,
            HookSubject::Command {
                name: "clean",
                rendered: "make clean",
            },
            &sel,
        );
        let err = registry.invoke("boom", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "Hook 'boom' failed: exploded");
    }
}
