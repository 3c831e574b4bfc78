/// The watch loop: waits on directory notifications and fires the responder
/// the first time the target file shows activity.
///
/// Runs on its own OS thread because it blocks inside the notification
/// receive. Nobody joins that thread in production: once the controller
/// returns, process exit abandons it.
use std::io;
use std::thread::JoinHandle;

use crate::responder::{ProcessTable, Responder, Truncate};
use crate::source::Subscription;
use crate::state::RunningState;
use crate::target::{ProcessSelector, WatchTarget};

/// Consumes batches from `sub` until an activity event names the target file.
///
/// On the first match `on_match` runs to completion, then `state` is flipped
/// to `false` and the loop ends. Returns `true` if it fired, `false` if the
/// subscription closed or the state was already finished.
pub fn watch(
    mut sub: Subscription,
    target: &WatchTarget,
    state: &RunningState,
    mut on_match: impl FnMut(),
) -> bool {
    while state.is_running() {
        let Some(batch) = sub.next_batch() else {
            return false;
        };

        let hit = batch
            .iter()
            .any(|ev| ev.kind.is_activity() && target.matches(&ev.file_name));
        if hit {
            println!(
                "[watch] {} Detected activity on {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                target.path().display()
            );
            on_match();
            state.finish();
            return true;
        }
    }
    false
}

/// Starts [`watch`] on a named background thread wired to `responder`.
pub fn spawn<P, T>(
    sub: Subscription,
    target: WatchTarget,
    selector: ProcessSelector,
    state: RunningState,
    mut responder: Responder<P, T>,
) -> io::Result<JoinHandle<bool>>
where
    P: ProcessTable + Send + 'static,
    T: Truncate + Send + 'static,
{
    std::thread::Builder::new()
        .name("file-watch".into())
        .spawn(move || {
            watch(sub, &target, &state, || {
                responder.respond(&selector, &target);
            })
        })
}
