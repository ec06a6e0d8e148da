// Push handler: runs one stage/commit/push cycle per file event.

use autopush_common::event::FsEvent;
use tracing::{debug, info};

use crate::git::sequence::{CycleError, CycleReport, PushSequence};
use crate::git::worker::{CommandExecutor, GitWorker, ProcessCommandExecutor};
use crate::output::{ConsoleReporter, Reporter};

/// Callback invoked by the watcher for each event. Directory events are
/// ignored; every other event runs the full sequence, with no coalescing
/// and no retry.
pub struct PushHandler<E = ProcessCommandExecutor, R = ConsoleReporter> {
    worker: GitWorker<E>,
    sequence: PushSequence,
    reporter: R,
}

impl<E: CommandExecutor, R: Reporter> PushHandler<E, R> {
    pub fn new(worker: GitWorker<E>, sequence: PushSequence, reporter: R) -> Self {
        Self { worker, sequence, reporter }
    }

    pub fn on_event(&self, event: &FsEvent) {
        if event.is_directory {
            debug!(path = %event.path.display(), kind = %event.kind, "ignoring directory event");
            return;
        }

        debug!(path = %event.path.display(), kind = %event.kind, "change detected");
        match self.run_cycle() {
            Ok(report) => {
                info!(tolerated = report.tolerated_failures(), "changes pushed");
                self.reporter.success();
            }
            Err(failure) => {
                info!(step = failure.step, error = %failure.source, "push cycle failed");
                self.reporter.failure(&failure);
            }
        }
    }

    /// One pass over the sequence, without reporting.
    pub fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        self.sequence.run(&self.worker)
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn worker(&self) -> &GitWorker<E> {
        &self.worker
    }
}
