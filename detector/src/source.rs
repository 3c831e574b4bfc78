/// Directory change notifications behind a small capability trait.
///
/// The watcher only sees [`Subscription`]s: a channel of event batches. The
/// production source is backed by `notify`'s recommended watcher, which picks
/// inotify on Linux, ReadDirectoryChangesW on Windows and FSEvents on macOS at
/// build time. Tests feed a subscription by hand through a plain channel.
use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

use crate::event::NotificationEvent;

const CHANNEL_CAPACITY: usize = 16;

/// Something that can deliver change batches for a directory.
pub trait ChangeSource {
    /// Starts watching `directory`. Fails if the directory cannot be opened
    /// for notifications (missing, not a directory, no permission).
    fn subscribe(&self, directory: &Path) -> Result<Subscription>;
}

/// A live stream of notification batches.
///
/// Holds whatever keeps the OS watch alive; dropping the subscription ends it.
pub struct Subscription {
    rx: mpsc::Receiver<Vec<NotificationEvent>>,
    _guard: Option<Box<dyn Send>>,
}

impl Subscription {
    /// A subscription fed directly through the returned sender. Dropping the
    /// sender closes the subscription.
    #[cfg(test)]
    pub fn channel() -> (mpsc::Sender<Vec<NotificationEvent>>, Subscription) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Subscription { rx, _guard: None })
    }

    /// Blocks until the next batch arrives. `None` once the source is gone.
    ///
    /// Must not be called from inside the async runtime.
    pub fn next_batch(&mut self) -> Option<Vec<NotificationEvent>> {
        self.rx.blocking_recv()
    }
}

/// Production source on top of `notify::RecommendedWatcher`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySource;

impl ChangeSource for NotifySource {
    fn subscribe(&self, directory: &Path) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel::<Vec<NotificationEvent>>(CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let batch = NotificationEvent::batch_from(&event);
                    if !batch.is_empty() {
                        let _ = tx.blocking_send(batch);
                    }
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", directory.display()))?;

        Ok(Subscription { rx, _guard: Some(Box::new(watcher)) })
    }
}
