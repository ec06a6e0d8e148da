// Console lines printed to the user: startup banner, cycle success, cycle failure.
//
// These go to stdout as plain text. Diagnostics go through `tracing` (stderr).

use std::fmt::Display;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};

pub const BANNER: &str = "🔍 Monitoraggio attivo... Premi CTRL+C per fermare.";
pub const SUCCESS_LINE: &str = "✅ Modifiche inviate a GitHub";
const FAILURE_PREFIX: &str = "❌ Errore: ";

/// Receives the user-facing outcome of the watcher and each push cycle.
pub trait Reporter: Send + Sync {
    fn banner(&self);
    fn success(&self);
    fn failure(&self, error: &dyn Display);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn banner(&self) {
        (**self).banner();
    }

    fn success(&self) {
        (**self).success();
    }

    fn failure(&self, error: &dyn Display) {
        (**self).failure(error);
    }
}

pub fn failure_line(error: &dyn Display) -> String {
    format!("{FAILURE_PREFIX}{error}")
}

/// Writes one line per report to `W` (stdout in production).
pub struct ConsoleReporter<W = Stdout> {
    out: Mutex<W>,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // A closed stdout must not take the watcher down with it.
        if let Err(error) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::debug!(%error, "failed to write console line");
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn banner(&self) {
        self.write_line(BANNER);
    }

    fn success(&self) {
        self.write_line(SUCCESS_LINE);
    }

    fn failure(&self, error: &dyn Display) {
        self.write_line(&failure_line(error));
    }
}

impl<W: Write + Send + Clone> ConsoleReporter<W> {
    /// Copy of everything written so far.
    pub fn snapshot(&self) -> W {
        self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}
