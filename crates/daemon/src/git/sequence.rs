// Push cycle: stage → commit → push, with a per-step failure policy.
//
// The policy lives in data. Each step says whether its failure ends the
// cycle or is recorded and skipped over.

use thiserror::Error;
use tracing::debug;

use super::worker::{CommandExecutor, GitCommand, GitWorker, GitWorkerError};
use crate::config::GitConfig;

/// What a failing step does to the rest of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the cycle and report the failure.
    Abort,
    /// Record the failure and run the next step.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStep {
    pub command: GitCommand,
    pub on_failure: FailurePolicy,
}

impl GitStep {
    pub fn abort_on_failure(command: GitCommand) -> Self {
        Self { command, on_failure: FailurePolicy::Abort }
    }

    pub fn continue_on_failure(command: GitCommand) -> Self {
        Self { command, on_failure: FailurePolicy::Continue }
    }
}

/// Result of one step that did not end the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded { step: &'static str },
    /// The step failed but its policy is [`FailurePolicy::Continue`].
    Tolerated { step: &'static str, error: GitWorkerError },
}

impl StepOutcome {
    pub fn step(&self) -> &'static str {
        match self {
            StepOutcome::Succeeded { step } | StepOutcome::Tolerated { step, .. } => *step,
        }
    }
}

/// Every step of a cycle that ran to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub steps: Vec<StepOutcome>,
}

impl CycleReport {
    pub fn tolerated_failures(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, StepOutcome::Tolerated { .. })).count()
    }
}

/// A step with [`FailurePolicy::Abort`] failed. Displays as the underlying
/// git failure so the console line carries the command's own message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source}")]
pub struct CycleError {
    pub step: &'static str,
    #[source]
    pub source: GitWorkerError,
}

/// Ordered list of git steps run once per qualifying filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSequence {
    steps: Vec<GitStep>,
}

impl PushSequence {
    pub fn new(steps: Vec<GitStep>) -> Self {
        Self { steps }
    }

    /// Stage everything (fatal), commit with the configured message
    /// (tolerated, covers "nothing to commit"), push to the configured
    /// remote branch (fatal).
    pub fn standard(git: &GitConfig) -> Self {
        Self::new(vec![
            GitStep::abort_on_failure(GitCommand::StageAll),
            GitStep::continue_on_failure(GitCommand::Commit {
                message: git.commit_message.clone(),
            }),
            GitStep::abort_on_failure(GitCommand::Push {
                remote: git.remote.clone(),
                branch: git.branch.clone(),
            }),
        ])
    }

    pub fn steps(&self) -> &[GitStep] {
        &self.steps
    }

    pub fn run<E: CommandExecutor>(
        &self,
        worker: &GitWorker<E>,
    ) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();

        for step in &self.steps {
            let name = step.command.name();
            match worker.execute(&step.command) {
                Ok(_) => {
                    debug!(step = name, "step completed");
                    report.steps.push(StepOutcome::Succeeded { step: name });
                }
                Err(error) => match step.on_failure {
                    FailurePolicy::Continue => {
                        debug!(step = name, %error, "step failed, continuing");
                        report.steps.push(StepOutcome::Tolerated { step: name, error });
                    }
                    FailurePolicy::Abort => {
                        return Err(CycleError { step: name, source: error });
                    }
                },
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::worker::tests::{failed, ok, MockExecutor};

    fn standard() -> PushSequence {
        PushSequence::standard(&GitConfig::default())
    }

    #[test]
    fn standard_sequence_is_stage_commit_push() {
        let sequence = standard();
        let steps = sequence.steps();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], GitStep::abort_on_failure(GitCommand::StageAll));
        assert_eq!(
            steps[1],
            GitStep::continue_on_failure(GitCommand::Commit {
                message: "Aggiornamento automatico".to_string()
            })
        );
        assert_eq!(
            steps[2],
            GitStep::abort_on_failure(GitCommand::Push {
                remote: "origin".to_string(),
                branch: "main".to_string()
            })
        );
    }

    #[test]
    fn standard_sequence_follows_config() {
        let git = GitConfig {
            remote: "upstream".into(),
            branch: "trunk".into(),
            commit_message: "sync".into(),
            ..GitConfig::default()
        };
        let sequence = PushSequence::standard(&git);

        let args: Vec<Vec<String>> = sequence.steps().iter().map(|s| s.command.args()).collect();
        assert_eq!(args[1], vec!["commit", "-m", "sync"]);
        assert_eq!(args[2], vec!["push", "upstream", "trunk"]);
    }

    #[test]
    fn all_steps_succeed() {
        let mock = MockExecutor::new(vec![ok(""), ok("[main 1a2b3c] msg\n"), ok("")]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let report = standard().run(&worker).expect("cycle should succeed");

        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.tolerated_failures(), 0);
        assert_eq!(
            mock.call_args(),
            vec![
                vec!["add", "."],
                vec!["commit", "-m", "Aggiornamento automatico"],
                vec!["push", "origin", "main"],
            ]
        );
    }

    #[test]
    fn commit_failure_does_not_prevent_push() {
        let mock = MockExecutor::new(vec![
            ok(""),
            failed(1, "nothing to commit, working tree clean\n", ""),
            ok(""),
        ]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let report = standard().run(&worker).expect("cycle should succeed");

        assert_eq!(mock.calls().len(), 3);
        assert_eq!(report.tolerated_failures(), 1);
        assert_eq!(report.steps[1].step(), "commit");
        assert!(matches!(report.steps[1], StepOutcome::Tolerated { .. }));
        assert_eq!(report.steps[2], StepOutcome::Succeeded { step: "push" });
    }

    #[test]
    fn commit_failure_of_any_kind_is_tolerated() {
        let mock = MockExecutor::new(vec![
            ok(""),
            failed(128, "", "fatal: unable to write new index file\n"),
            ok(""),
        ]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        assert!(standard().run(&worker).is_ok());
        assert_eq!(mock.calls().len(), 3);
    }

    #[test]
    fn stage_failure_stops_after_one_invocation() {
        let mock = MockExecutor::new(vec![failed(128, "", "fatal: not a git repository\n")]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let error = standard().run(&worker).expect_err("cycle should fail");

        assert_eq!(mock.calls().len(), 1);
        assert_eq!(error.step, "stage");
        assert!(error.to_string().contains("fatal: not a git repository"));
    }

    #[test]
    fn push_failure_is_fatal() {
        let mock = MockExecutor::new(vec![
            ok(""),
            ok(""),
            failed(128, "", "fatal: unable to access remote\n"),
        ]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let error = standard().run(&worker).expect_err("cycle should fail");

        assert_eq!(mock.calls().len(), 3);
        assert_eq!(error.step, "push");
        assert_eq!(
            error.to_string(),
            "`git push origin main` failed with code 128: fatal: unable to access remote"
        );
    }

    #[test]
    fn abort_step_in_the_middle_skips_the_rest() {
        let sequence = PushSequence::new(vec![
            GitStep::abort_on_failure(GitCommand::StageAll),
            GitStep::abort_on_failure(GitCommand::Commit { message: "m".into() }),
            GitStep::abort_on_failure(GitCommand::Push {
                remote: "origin".into(),
                branch: "main".into(),
            }),
        ]);
        let mock = MockExecutor::new(vec![ok(""), failed(1, "nothing to commit\n", "")]);
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let error = sequence.run(&worker).expect_err("strict commit should abort");

        assert_eq!(error.step, "commit");
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn empty_sequence_reports_nothing() {
        let mock = MockExecutor::new(Vec::new());
        let worker = GitWorker::with_executor("/tmp/repo", mock.clone());

        let report = PushSequence::new(Vec::new()).run(&worker).expect("nothing to fail");
        assert!(report.steps.is_empty());
        assert!(mock.calls().is_empty());
    }
}
