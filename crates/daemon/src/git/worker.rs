use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, trace};

/// Default executable used for every repository operation.
pub const DEFAULT_GIT_PROGRAM: &str = "git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitWorkerError {
    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },
    #[error("`{command}` failed {}: {}", exit_status(.code), .stderr.trim())]
    CommandFailed { command: String, code: Option<i32>, stderr: String },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("with code {code}"),
        None => "by signal".to_string(),
    }
}

/// A repository operation the push cycle can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCommand {
    /// Stage every change in the working tree.
    StageAll,
    /// Record the staged changes with a message.
    Commit { message: String },
    /// Send local commits to `remote`/`branch`.
    Push { remote: String, branch: String },
}

impl GitCommand {
    pub fn args(&self) -> Vec<String> {
        match self {
            GitCommand::StageAll => vec!["add".to_string(), ".".to_string()],
            GitCommand::Commit { message } => {
                vec!["commit".to_string(), "-m".to_string(), message.clone()]
            }
            GitCommand::Push { remote, branch } => {
                vec!["push".to_string(), remote.clone(), branch.clone()]
            }
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitCommand::StageAll => "stage",
            GitCommand::Commit { .. } => "commit",
            GitCommand::Push { .. } => "push",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs git in a fixed repository directory, one process per operation.
#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    program: String,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self::with_executor(repo_path, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), program: DEFAULT_GIT_PROGRAM.to_string(), executor }
    }

    /// Use a different git executable (absolute path or name on `PATH`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn execute(&self, command: &GitCommand) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(command.args())
    }

    fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitWorkerError> {
        let command = format!("{} {}", self.program, args.join(" "));
        trace!(%command, cwd = %self.repo_path.display(), "running git");
        let result =
            self.executor.execute(&self.program, &args, &self.repo_path).map_err(|error| {
                GitWorkerError::SpawnFailed { command: command.clone(), message: error.to_string() }
            })?;

        if result.success {
            debug!(%command, "git command succeeded");
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitWorkerError::CommandFailed { command, code: result.code, stderr })
    }
}
