mod cli;
mod config;
mod event;
mod lifecycle;
mod responder;
mod source;
mod state;
mod target;
mod watcher;

use anyhow::{Context, Result};

use crate::config::Policy;
use crate::lifecycle::{ConsoleAck, Controller};
use crate::responder::Responder;
use crate::source::{ChangeSource, NotifySource};
use crate::state::RunningState;
use crate::target::{ProcessSelector, WatchTarget};

#[tokio::main]
async fn main() {
    let args = match cli::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(_) => {
            println!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args, Policy::default()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args, policy: Policy) -> Result<()> {
    let mut controller = Controller::new();

    // ── Startup ───────────────────────────────────────────────────────────────
    let target = WatchTarget::from_path(&args.file_path)?;
    let selector = ProcessSelector::new(args.process_name);
    let state = RunningState::new();

    let subscription = NotifySource.subscribe(target.directory())?;

    println!("Monitoring {} for activity...", args.file_path.display());

    // Never joined; process exit abandons the watcher thread.
    watcher::spawn(
        subscription,
        target,
        selector,
        state.clone(),
        Responder::system(policy),
    )
    .context("Failed to start watcher thread")?;
    controller.started()?;

    // ── Wait ──────────────────────────────────────────────────────────────────
    controller
        .wait(&state, policy.poll_interval, lifecycle::ctrl_c())
        .await?;

    // ── Shutdown ──────────────────────────────────────────────────────────────
    controller.acknowledge(&mut ConsoleAck)?;
    Ok(())
}
