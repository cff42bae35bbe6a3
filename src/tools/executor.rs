use std::process::{Command, Output};

use super::error::ExecutionError;
use crate::util;

/// What an external process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for CommandResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs an argument vector to completion.
///
/// A non-zero exit is still `Ok`; only a process that never started is an error.
/// There is no timeout, a hanging tool blocks the caller.
pub trait Executor {
    fn run(&self, argv: &[String], use_shell: bool) -> Result<CommandResult, ExecutionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    fn direct(argv: &[String]) -> Result<Command, ExecutionError> {
        let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
        let mut command = Command::new(program);
        command.args(args);
        Ok(command)
    }

    #[cfg(not(windows))]
    fn shell(argv: &[String]) -> Result<Command, ExecutionError> {
        if argv.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }

        let mut command = Command::new("sh");
        command.arg("-c").arg(util::shell_line(argv));
        Ok(command)
    }

    #[cfg(windows)]
    fn shell(argv: &[String]) -> Result<Command, ExecutionError> {
        use std::os::windows::process::CommandExt;

        if argv.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }

        let mut command = Command::new("cmd");
        command.arg("/C").raw_arg(util::cmd_line(argv));
        Ok(command)
    }
}

impl Executor for ProcessExecutor {
    fn run(&self, argv: &[String], use_shell: bool) -> Result<CommandResult, ExecutionError> {
        let mut command = if use_shell {
            Self::shell(argv)?
        } else {
            Self::direct(argv)?
        };

        log::info!(
            "Running command ({}): {}",
            if use_shell { "shell" } else { "direct" },
            argv.join(" ")
        );

        let output = command.output().map_err(|source| ExecutionError::Launch {
            program: argv[0].clone(),
            source,
        })?;
        let result = CommandResult::from(output);

        if result.success() {
            log::debug!("Command finished: {}", argv.join(" "));
        } else {
            log::warn!(
                "Command exited with {:?}: {}",
                result.code,
                result.stderr.trim()
            );
        }

        Ok(result)
    }
}
