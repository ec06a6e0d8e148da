// Rename pairing for raw notify events.
//
// Backends report a rename as a `From` half, a `To` half and, on inotify,
// a trailing `Both` event carrying both paths. One rename must reach the
// callback once, as the destination, so the halves are folded together
// here before translation.

use std::path::PathBuf;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// How long a `From` half waits for its `To` half before it is released on
/// its own (the path left the watched tree).
pub const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(100);

/// Folds rename halves into single `Both` events.
///
/// Feed every raw event through [`accept`](Self::accept). While
/// [`is_pending`](Self::is_pending) is true, call [`flush`](Self::flush)
/// once [`RENAME_PAIR_WINDOW`] passes without new events.
#[derive(Debug, Default)]
pub struct RenamePairing {
    /// `From` half waiting for its partner.
    pending: Option<Event>,
    /// Paths of the last folded rename, to drop the backend's own `Both`.
    folded: Option<Vec<PathBuf>>,
}

impl RenamePairing {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Events ready for translation after seeing `event`, in order.
    pub fn accept(&mut self, event: Event) -> Vec<Event> {
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                let released = self.flush();
                self.folded = None;
                self.pending = Some(event);
                released
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => match self.pending.take() {
                Some(from) if from.attrs.tracker() == event.attrs.tracker() => {
                    let both = fold(from, event);
                    self.folded = Some(both.paths.clone());
                    vec![both]
                }
                unmatched => {
                    self.folded = None;
                    unmatched.into_iter().chain(std::iter::once(event)).collect()
                }
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::Both))
                if self.folded.as_ref() == Some(&event.paths) =>
            {
                self.folded = None;
                Vec::new()
            }
            _ => {
                self.folded = None;
                let mut ready = self.flush();
                ready.push(event);
                ready
            }
        }
    }

    /// Release a `From` half whose partner never arrived.
    pub fn flush(&mut self) -> Vec<Event> {
        self.pending.take().into_iter().collect()
    }
}

fn fold(from: Event, to: Event) -> Event {
    let mut both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_some_path(from.paths.into_iter().next())
        .add_some_path(to.paths.into_iter().next());
    if let Some(tracker) = to.attrs.tracker() {
        both = both.set_tracker(tracker);
    }
    both
}
