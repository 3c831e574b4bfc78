use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::EventKind;
use std::ffi::OsString;

/// Coarse change classification, independent of the notification backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
    Removed,
    /// The file was opened. Not every backend reports this.
    Opened,
    /// A handle opened for writing was closed.
    Written,
    /// Reads and anything the backend could not classify.
    Other,
}

impl ChangeKind {
    /// Whether this kind of change counts as activity on the watched file.
    pub fn is_activity(self) -> bool {
        !matches!(self, ChangeKind::Other)
    }
}

impl From<EventKind> for ChangeKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
            EventKind::Modify(_) | EventKind::Any => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Access(AccessKind::Open(_)) => ChangeKind::Opened,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => ChangeKind::Written,
            EventKind::Access(_) | EventKind::Other => ChangeKind::Other,
        }
    }
}

/// One change record: what happened, to which entry of the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: ChangeKind,
    /// Base name only; the directory is implied by the subscription.
    pub file_name: OsString,
}

impl NotificationEvent {
    pub fn new(kind: ChangeKind, file_name: impl Into<OsString>) -> Self {
        Self { kind, file_name: file_name.into() }
    }

    /// Flattens a `notify` event into one record per affected path.
    /// Paths without a file name component are dropped.
    pub fn batch_from(event: &notify::Event) -> Vec<NotificationEvent> {
        let kind = ChangeKind::from(event.kind);
        event
            .paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| NotificationEvent::new(kind, name))
            .collect()
    }
}
