// src/system/executor.rs

use crate::{
    CancellationToken,
    core::session::{TaskRequest, TaskRunner},
    models::Invocation,
};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command as StdCommand, Stdio};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    #[error("Command '{command}' did not finish within {}s and was stopped.", .after.as_secs_f32())]
    TimedOut { command: String, after: Duration },
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

/// Runs tasks as child processes of the current one.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cancellation_token: CancellationToken,
}

impl ProcessRunner {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self { cancellation_token }
    }
}

impl TaskRunner for ProcessRunner {
    fn run(&mut self, task: &TaskRequest) -> Result<(), ExecutionError> {
        log::info!("Running task '{}': {}", task.name, task.command_line);
        execute_command(
            &task.command_line,
            task.invocation,
            &task.cwd,
            &self.cancellation_token,
            task.timeout,
        )
    }
}

/// Executes a system command and waits for it, honouring cancellation and an optional deadline.
///
/// A leading `-` marks the command as allowed to fail: its exit status is ignored.
/// On cancellation or timeout the child is killed before returning.
pub fn execute_command(
    command_line: &str,
    invocation: Invocation,
    cwd: &Path,
    cancellation_token: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<(), ExecutionError> {
    let trimmed_command = command_line.trim();
    let (final_command_line, ignore_errors) = match trimmed_command.strip_prefix('-') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed_command, false),
    };

    if final_command_line.is_empty() {
        return Ok(()); // An empty command is a success, not an error.
    }

    let clean_cwd = dunce::simplified(cwd);
    let mut child = match invocation {
        Invocation::Shell => shell_command(final_command_line)
            .current_dir(clean_cwd)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ExecutionError::CommandFailed(final_command_line.to_string(), e))?,
        Invocation::Process => spawn_process(final_command_line, clean_cwd)?,
    };

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() && !ignore_errors {
                    return Err(ExecutionError::NonZeroExitStatus(
                        final_command_line.to_string(),
                    ));
                }
                return Ok(());
            }
            Ok(None) => {
                let stop_reason = if cancellation_token.load(Ordering::SeqCst) {
                    Some(ExecutionError::Cancelled)
                } else {
                    match timeout {
                        Some(limit) if started.elapsed() >= limit => {
                            Some(ExecutionError::TimedOut {
                                command: final_command_line.to_string(),
                                after: limit,
                            })
                        }
                        _ => None,
                    }
                };

                if let Some(reason) = stop_reason {
                    log::debug!(
                        "Stopping child process (PID: {}): {}",
                        child.id(),
                        reason
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(reason);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed(
                    final_command_line.to_string(),
                    e,
                ));
            }
        }
    }
}

fn shell_command(command_line: &str) -> StdCommand {
    if cfg!(target_os = "windows") {
        let mut command = StdCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = StdCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

/// Splits the line with shell-like quoting and starts the program without a shell.
fn spawn_process(command_line: &str, cwd: &Path) -> Result<Child, ExecutionError> {
    let parts = shlex::split(command_line)
        .ok_or_else(|| ExecutionError::CommandParse(command_line.to_string()))?;
    let Some((program, args)) = parts.split_first() else {
        return Err(ExecutionError::CommandParse(command_line.to_string()));
    };

    let spawned = StdCommand::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn();

    // Built-ins like `echo` only exist inside `cmd` on Windows.
    match spawned {
        Ok(child) => Ok(child),
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            shell_command(command_line)
                .current_dir(cwd)
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|e| ExecutionError::CommandFailed(command_line.to_string(), e))
        }
        Err(e) => Err(ExecutionError::CommandFailed(command_line.to_string(), e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    fn run(command_line: &str, invocation: Invocation) -> Result<(), ExecutionError> {
        execute_command(command_line, invocation, &std::env::temp_dir(), &token(), None)
    }

    #[test]
    fn test_success_and_failure() {
        for invocation in [Invocation::Shell, Invocation::Process] {
            assert!(run("true", invocation).is_ok());
            assert!(matches!(
                run("false", invocation),
                Err(ExecutionError::NonZeroExitStatus(_))
            ));
        }
    }

    #[test]
    fn test_shell_operators_are_interpreted() {
        assert!(matches!(
            run("true && false", Invocation::Shell),
            Err(ExecutionError::NonZeroExitStatus(_))
        ));
        assert!(run("false || true", Invocation::Shell).is_ok());
        assert!(matches!(
            run("true; exit 3", Invocation::Shell),
            Err(ExecutionError::NonZeroExitStatus(_))
        ));
    }

    #[test]
    fn test_shell_redirects_write_files() {
        let dir = tempfile::tempdir().unwrap();
        execute_command(
            "echo hi > out.txt && cat out.txt | grep -q hi",
            Invocation::Shell,
            dir.path(),
            &token(),
            None,
        )
        .unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "hi");
    }

    #[test]
    fn test_process_invocation_passes_operators_as_arguments() {
        let dir = tempfile::tempdir().unwrap();
        execute_command(
            "echo hi > out.txt",
            Invocation::Process,
            dir.path(),
            &token(),
            None,
        )
        .unwrap();
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_leading_dash_ignores_errors() {
        assert!(run("- false", Invocation::Process).is_ok());
        assert!(run("- true && false", Invocation::Shell).is_ok());
    }

    #[test]
    fn test_empty_command_is_success() {
        assert!(run("   ", Invocation::Shell).is_ok());
        assert!(run("-", Invocation::Process).is_ok());
    }

    #[test]
    fn test_unparsable_and_missing_commands() {
        assert!(matches!(
            run("echo 'unterminated", Invocation::Process),
            Err(ExecutionError::CommandParse(_))
        ));
        assert!(matches!(
            run("buildopts-no-such-binary-here", Invocation::Process),
            Err(ExecutionError::CommandFailed(..))
        ));
        // The shell starts fine and reports the missing program through its exit code.
        assert!(matches!(
            run("buildopts-no-such-binary-here", Invocation::Shell),
            Err(ExecutionError::NonZeroExitStatus(_))
        ));
    }

    #[test]
    fn test_timeout_kills_the_child() {
        let started = Instant::now();
        let result = execute_command(
            "sleep 5",
            Invocation::Process,
            &std::env::temp_dir(),
            &token(),
            Some(Duration::from_millis(200)),
        );
        assert!(matches!(result, Err(ExecutionError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancellation_stops_the_child() {
        let cancel = token();
        cancel.store(true, Ordering::SeqCst);
        let result = execute_command(
            "sleep 5",
            Invocation::Shell,
            &std::env::temp_dir(),
            &cancel,
            None,
        );
        assert!(matches!(result, Err(ExecutionError::Cancelled)));
    }

    #[test]
    fn test_process_runner_uses_task_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(token());
        let task = TaskRequest {
            name: "build".to_string(),
            command_line: "mkdir -p out && touch out/built.flag".to_string(),
            invocation: Invocation::Shell,
            cwd: dir.path().to_path_buf(),
            timeout: Some(Duration::from_secs(10)),
        };
        runner.run(&task).unwrap();
        assert!(dir.path().join("out").join("built.flag").exists());
    }
}
