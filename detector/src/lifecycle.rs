/// Foreground side of the program: waits for the watcher to fire or the user
/// to interrupt, then holds the console open until the operator acknowledges.
///
/// Phases: `Starting → Watching → {Triggered | Interrupted} → AwaitingAck → Terminated`.
use anyhow::{bail, Result};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::state::RunningState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Watching,
    /// The watcher fired and the responder finished.
    Triggered,
    /// Ctrl+C arrived before anything fired.
    Interrupted,
    AwaitingAck,
    Terminated,
}

impl Phase {
    fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Starting, Watching)
                | (Watching, Triggered)
                | (Watching, Interrupted)
                | (Triggered, AwaitingAck)
                | (Interrupted, AwaitingAck)
                | (AwaitingAck, Terminated)
        )
    }
}

// ── Acknowledgment ────────────────────────────────────────────────────────────

/// The final "don't close this window yet" pause.
pub trait Acknowledge {
    fn acknowledge(&mut self);
}

/// Prompts on stdout and blocks until a line (or EOF) arrives on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAck;

impl Acknowledge for ConsoleAck {
    fn acknowledge(&mut self) {
        print!("Press Enter to quit");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Controller {
    phase: Phase,
}

impl Controller {
    pub fn new() -> Self {
        Self { phase: Phase::Starting }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            bail!("Illegal phase transition: {:?} -> {:?}", self.phase, next);
        }
        self.phase = next;
        Ok(())
    }

    /// Records that the watcher is running.
    pub fn started(&mut self) -> Result<()> {
        self.advance(Phase::Watching)
    }

    /// Sleeps in `poll` increments while `state` is running, or until
    /// `interrupt` resolves. Returns the phase it ended in.
    pub async fn wait<F>(&mut self, state: &RunningState, poll: Duration, interrupt: F) -> Result<Phase>
    where
        F: Future<Output = ()>,
    {
        if self.phase != Phase::Watching {
            bail!("Cannot wait from phase {:?}", self.phase);
        }

        tokio::pin!(interrupt);
        let next = loop {
            if !state.is_running() {
                break Phase::Triggered;
            }
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = &mut interrupt => {
                    println!("Interrupted");
                    break Phase::Interrupted;
                }
            }
        };

        self.advance(next)?;
        Ok(next)
    }

    /// Blocks on `ack`, then terminates.
    pub fn acknowledge(&mut self, ack: &mut impl Acknowledge) -> Result<()> {
        self.advance(Phase::AwaitingAck)?;
        ack.acknowledge();
        self.advance(Phase::Terminated)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("[main] Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
