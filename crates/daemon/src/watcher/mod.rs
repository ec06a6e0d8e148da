// File watcher: OS notifications (inotify / fsevents) → FsEvent → callback.
//
// The watcher owns a delivery thread that folds rename halves, translates
// raw events and calls the subscriber's callback once per change, in arrival
// order. A slow callback backs up the bounded channel and then notify's own
// thread, never the caller.

pub mod rename;

use anyhow::{bail, Context, Result};
use autopush_common::event::{FsEvent, FsEventKind};
use autopush_common::path::{is_git_internal, is_inside_root};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

use self::rename::{RenamePairing, RENAME_PAIR_WINDOW};

/// Callback run on the delivery thread for every event.
pub type EventCallback = Box<dyn FnMut(FsEvent) + Send + 'static>;

/// Capacity for the internal event channel.
const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Something that reports filesystem changes under a root directory.
pub trait DirectoryWatcher {
    /// Start delivering events under `root` to `on_event`.
    fn subscribe(&mut self, root: &Path, recursive: bool, on_event: EventCallback) -> Result<()>;

    /// Stop watching. The callback currently running, if any, finishes;
    /// queued events are dropped.
    fn stop(&mut self);

    /// Wait for the delivery thread to exit. Call after [`stop`](Self::stop).
    fn join(&mut self);
}

/// Which raw events reach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub ignore_git_dir: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self { ignore_git_dir: true }
    }
}

enum Delivery {
    Event(Event),
    Stop,
}

/// [`DirectoryWatcher`] backed by `notify`'s OS-native watcher.
pub struct NotifyWatcher {
    filter: EventFilter,
    watcher: Option<RecommendedWatcher>,
    sender: Option<SyncSender<Delivery>>,
    stopping: Arc<AtomicBool>,
    delivery: Option<JoinHandle<()>>,
    root: Option<PathBuf>,
}

impl NotifyWatcher {
    pub fn new(filter: EventFilter) -> Self {
        Self {
            filter,
            watcher: None,
            sender: None,
            stopping: Arc::new(AtomicBool::new(false)),
            delivery: None,
            root: None,
        }
    }

    /// The canonicalized root directory being watched, once subscribed.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new(EventFilter::default())
    }
}

impl DirectoryWatcher for NotifyWatcher {
    fn subscribe(&mut self, root: &Path, recursive: bool, on_event: EventCallback) -> Result<()> {
        if self.watcher.is_some() {
            bail!("watcher is already subscribed to {}", root.display());
        }

        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;

        let (tx, rx) = mpsc::sync_channel(EVENT_CHANNEL_CAPACITY);
        self.stopping = Arc::new(AtomicBool::new(false));
        let stopping = Arc::clone(&self.stopping);
        let scope = Scope { root: root.clone(), filter: self.filter };
        let delivery = thread::Builder::new()
            .name("autopush-delivery".to_string())
            .spawn(move || deliver(rx, stopping, scope, on_event))
            .context("failed to spawn event delivery thread")?;

        let event_tx = tx.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(Delivery::Event(event)).is_err() {
                    // Delivery thread gone, watcher is shutting down.
                    debug!("event channel closed, stopping event dispatch");
                }
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
            }
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(error) => {
                self.shutdown_delivery(tx, delivery);
                return Err(error).context("failed to create file watcher");
            }
        };

        let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        if let Err(error) = watcher.watch(&root, mode) {
            drop(watcher);
            self.shutdown_delivery(tx, delivery);
            return Err(error)
                .with_context(|| format!("failed to watch directory: {}", root.display()));
        }

        debug!(path = %root.display(), recursive, "file watcher started");

        self.watcher = Some(watcher);
        self.sender = Some(tx);
        self.delivery = Some(delivery);
        self.root = Some(root);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Dropping the notify watcher ends OS-level delivery.
        self.watcher.take();
        if let Some(sender) = self.sender.take() {
            // On a full queue the delivery loop still sees the flag before
            // its next event.
            if let Err(TrySendError::Disconnected(_)) = sender.try_send(Delivery::Stop) {
                trace!("delivery thread already gone");
            }
        }
        debug!("file watcher stopped");
    }

    fn join(&mut self) {
        if let Some(handle) = self.delivery.take() {
            if handle.join().is_err() {
                warn!("event delivery thread panicked");
            }
        }
    }
}

impl NotifyWatcher {
    fn shutdown_delivery(&mut self, tx: SyncSender<Delivery>, delivery: JoinHandle<()>) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = tx.try_send(Delivery::Stop);
        drop(tx);
        let _ = delivery.join();
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Root and filter the delivery thread translates against.
struct Scope {
    root: PathBuf,
    filter: EventFilter,
}

fn deliver(
    rx: Receiver<Delivery>,
    stopping: Arc<AtomicBool>,
    scope: Scope,
    mut on_event: EventCallback,
) {
    let mut renames = RenamePairing::default();
    loop {
        let message = if renames.is_pending() {
            match rx.recv_timeout(RENAME_PAIR_WINDOW) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    if !dispatch(renames.flush(), &scope, &stopping, &mut on_event) {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            }
        };

        match message {
            Delivery::Event(event) => {
                if !dispatch(renames.accept(event), &scope, &stopping, &mut on_event) {
                    break;
                }
            }
            Delivery::Stop => break,
        }
    }
    trace!("event delivery thread exiting");
}

/// Translate and deliver `events`. Returns false once stopping.
fn dispatch(
    events: Vec<Event>,
    scope: &Scope,
    stopping: &AtomicBool,
    on_event: &mut EventCallback,
) -> bool {
    for event in &events {
        for fs_event in translate_event(event, &scope.root, scope.filter) {
            if stopping.load(Ordering::SeqCst) {
                return false;
            }
            on_event(fs_event);
        }
    }
    !stopping.load(Ordering::SeqCst)
}

/// Translate a `notify::Event` into zero or more `FsEvent`s.
///
/// Access and `Other` events are not mutations and are dropped. A rename
/// reported with both endpoints becomes a single `Moved` event for the
/// destination. A lone rename half (a path moved into or out of the tree)
/// becomes a `Moved` event for its own path.
pub fn translate_event(event: &Event, root: &Path, filter: EventFilter) -> Vec<FsEvent> {
    let (kind, declared_dir) = match &event.kind {
        EventKind::Create(create_kind) => (FsEventKind::Created, folder_hint_create(*create_kind)),
        EventKind::Remove(remove_kind) => (FsEventKind::Deleted, folder_hint_remove(*remove_kind)),
        EventKind::Modify(ModifyKind::Name(_)) => (FsEventKind::Moved, None),
        EventKind::Modify(_) | EventKind::Any => (FsEventKind::Modified, None),
        EventKind::Access(_) | EventKind::Other => {
            trace!(kind = ?event.kind, "skipping non-mutation event");
            return Vec::new();
        }
    };

    let paths: &[PathBuf] = match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            &event.paths[event.paths.len() - 1..]
        }
        _ => &event.paths,
    };

    paths
        .iter()
        .filter(|p| {
            if is_inside_root(p, root) {
                true
            } else {
                warn!(path = %p.display(), "ignoring event outside watch root (possible symlink escape)");
                false
            }
        })
        .filter(|p| {
            let skip = filter.ignore_git_dir && is_git_internal(p, root);
            if skip {
                trace!(path = %p.display(), "skipping event inside .git");
            }
            !skip
        })
        .map(|p| {
            let is_directory = declared_dir.unwrap_or_else(|| p.is_dir());
            FsEvent::new(kind, p.clone(), is_directory)
        })
        .collect()
}

fn folder_hint_create(kind: CreateKind) -> Option<bool> {
    match kind {
        CreateKind::Folder => Some(true),
        CreateKind::File => Some(false),
        _ => None,
    }
}

fn folder_hint_remove(kind: RemoveKind) -> Option<bool> {
    match kind {
        RemoveKind::Folder => Some(true),
        RemoveKind::File => Some(false),
        _ => None,
    }
}
