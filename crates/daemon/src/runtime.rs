use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, trace};

use crate::config::AutopushConfig;
use crate::git::sequence::PushSequence;
use crate::git::worker::GitWorker;
use crate::handler::PushHandler;
use crate::output::{ConsoleReporter, Reporter};
use crate::watcher::{DirectoryWatcher, EventCallback, EventFilter, NotifyWatcher};

/// Log filter when `RUST_LOG` is unset. Cycle outcomes log below it; the
/// console reporter owns the user-facing lines.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Running => "running",
            Lifecycle::Stopping => "stopping",
            Lifecycle::Stopped => "stopped",
        })
    }
}

fn enter(state: Lifecycle) {
    info!(%state, "watch lifecycle");
}

/// Watch `root` with the production stack until Ctrl-C.
pub async fn run_standalone(root: &Path) -> Result<()> {
    let config = AutopushConfig::load(root).context("failed to load autopush config")?;
    let reporter = Arc::new(ConsoleReporter::stdout());

    let worker = GitWorker::new(root).with_program(config.git.program.clone());
    let handler =
        PushHandler::new(worker, PushSequence::standard(&config.git), Arc::clone(&reporter));
    let watcher = NotifyWatcher::new(EventFilter { ignore_git_dir: config.watch.ignore_git_dir });

    info!(
        root = %root.display(),
        remote = %config.git.remote,
        branch = %config.git.branch,
        "push cycle configured"
    );
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to listen for Ctrl-C, stopping");
        }
    };

    run_until_shutdown(
        watcher,
        root,
        Box::new(move |event| handler.on_event(&event)),
        &*reporter,
        config.watch.tick(),
        shutdown,
    )
    .await
}

/// Subscribe `watcher` to `root`, print the banner, then idle in `tick`
/// steps until `shutdown` resolves. On shutdown the watcher is stopped and
/// its delivery thread joined, so a cycle already running completes.
pub async fn run_until_shutdown<W, F>(
    mut watcher: W,
    root: &Path,
    on_event: EventCallback,
    reporter: &dyn Reporter,
    tick: Duration,
    shutdown: F,
) -> Result<()>
where
    W: DirectoryWatcher + Send + 'static,
    F: Future<Output = ()>,
{
    watcher
        .subscribe(root, true, on_event)
        .with_context(|| format!("failed to start watching {}", root.display()))?;
    reporter.banner();
    enter(Lifecycle::Running);

    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => trace!("watch loop tick"),
        }
    }

    enter(Lifecycle::Stopping);
    tokio::task::spawn_blocking(move || {
        watcher.stop();
        watcher.join();
    })
    .await
    .context("watcher shutdown task failed")?;

    enter(Lifecycle::Stopped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitConfig;
    use crate::git::worker::tests::{failed, ok, MockExecutor};
    use autopush_common::event::{FsEvent, FsEventKind};
    use std::sync::Mutex;

    /// Records calls and replays `events` synchronously on subscribe.
    struct FakeWatcher {
        log: Arc<Mutex<Vec<String>>>,
        events: Vec<FsEvent>,
        fail_subscribe: bool,
    }

    impl FakeWatcher {
        fn new(events: Vec<FsEvent>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            (Self { log: Arc::clone(&log), events, fail_subscribe: false }, log)
        }
    }

    impl DirectoryWatcher for FakeWatcher {
        fn subscribe(
            &mut self,
            root: &Path,
            recursive: bool,
            mut on_event: EventCallback,
        ) -> Result<()> {
            if self.fail_subscribe {
                anyhow::bail!("no such directory");
            }
            self.log.lock().unwrap().push(format!("subscribe {} {recursive}", root.display()));
            for event in self.events.drain(..) {
                on_event(event);
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().push("stop".to_string());
        }

        fn join(&mut self) {
            self.log.lock().unwrap().push("join".to_string());
        }
    }

    fn console(reporter: &ConsoleReporter<Vec<u8>>) -> Vec<String> {
        String::from_utf8(reporter.snapshot()).unwrap().lines().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn subscribes_recursively_then_stops_and_joins_on_shutdown() {
        let (watcher, log) = FakeWatcher::new(Vec::new());
        let reporter = ConsoleReporter::new(Vec::new());

        run_until_shutdown(
            watcher,
            Path::new("/repo"),
            Box::new(|_| {}),
            &reporter,
            Duration::from_millis(5),
            async {},
        )
        .await
        .expect("runtime should exit cleanly");

        assert_eq!(*log.lock().unwrap(), vec!["subscribe /repo true", "stop", "join"]);
        assert_eq!(
            console(&reporter),
            vec!["🔍 Monitoraggio attivo... Premi CTRL+C per fermare.".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_ticking_until_shutdown_fires() {
        let (watcher, log) = FakeWatcher::new(Vec::new());
        let reporter = ConsoleReporter::new(Vec::new());

        run_until_shutdown(
            watcher,
            Path::new("/repo"),
            Box::new(|_| {}),
            &reporter,
            Duration::from_secs(1),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await
        .expect("runtime should exit cleanly");

        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("join"));
    }

    #[tokio::test]
    async fn subscribe_failure_is_returned_without_banner() {
        let (mut watcher, log) = FakeWatcher::new(Vec::new());
        watcher.fail_subscribe = true;
        let reporter = ConsoleReporter::new(Vec::new());

        let error = run_until_shutdown(
            watcher,
            Path::new("/missing"),
            Box::new(|_| {}),
            &reporter,
            Duration::from_millis(5),
            async {},
        )
        .await
        .expect_err("subscribe failure should propagate");

        assert!(error.to_string().contains("failed to start watching /missing"));
        assert!(console(&reporter).is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivered_events_drive_the_push_handler() {
        let (watcher, _log) = FakeWatcher::new(vec![
            FsEvent::directory(FsEventKind::Created, "/repo/subdir"),
            FsEvent::file(FsEventKind::Created, "/repo/subdir/a.txt"),
        ]);
        let mock = MockExecutor::new(vec![ok(""), failed(1, "nothing to commit\n", ""), ok("")]);
        let reporter = Arc::new(ConsoleReporter::new(Vec::new()));
        let handler = PushHandler::new(
            GitWorker::with_executor("/repo", mock.clone()),
            PushSequence::standard(&GitConfig::default()),
            Arc::clone(&reporter),
        );

        run_until_shutdown(
            watcher,
            Path::new("/repo"),
            Box::new(move |event| handler.on_event(&event)),
            &*reporter,
            Duration::from_millis(5),
            async {},
        )
        .await
        .expect("runtime should exit cleanly");

        // Directory event ignored, file event ran one full cycle.
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(
            console(&reporter),
            vec![
                "✅ Modifiche inviate a GitHub".to_string(),
                "🔍 Monitoraggio attivo... Premi CTRL+C per fermare.".to_string(),
            ]
        );
    }

    #[test]
    fn lifecycle_display() {
        assert_eq!(Lifecycle::Running.to_string(), "running");
        assert_eq!(Lifecycle::Stopping.to_string(), "stopping");
        assert_eq!(Lifecycle::Stopped.to_string(), "stopped");
    }
}
