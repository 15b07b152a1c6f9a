use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::manager::MountManager;

/// A command we can send to the poller task.
#[derive(Debug)]
enum PollCommand {
    Refresh,
    Stop,
}

/// Periodically re-checks every profile's mount point and feeds the
/// results into the manager's status board, which emits
/// [`crate::core::Event::StatusChanged`] on edges only.
///
/// The first tick fires immediately so subscribers get an initial state.
/// Dropping the handle without calling [`StatusPoller::stop`] also ends
/// the task once the command channel closes.
pub struct StatusPoller {
    commands: mpsc::Sender<PollCommand>,
    task: JoinHandle<()>,
}

impl StatusPoller {
    /// Spawns the poll loop on the current tokio runtime.
    pub fn spawn(manager: MountManager, period: Duration) -> Self {
        let (commands, mut rx) = mpsc::channel::<PollCommand>(8);
        let task = tokio::spawn(async move {
            info!("Status poller started (every {:?})", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        poll_once(&manager).await;
                    }
                    command = rx.recv() => match command {
                        Some(PollCommand::Refresh) => {
                            debug!("Manual refresh requested");
                            poll_once(&manager).await;
                            ticker.reset();
                        }
                        Some(PollCommand::Stop) | None => break,
                    },
                }
            }
            info!("Status poller stopped");
        });
        Self { commands, task }
    }

    /// Poll right away instead of waiting for the next tick.
    pub fn refresh(&self) {
        // A full queue already has a refresh pending.
        let _ = self.commands.try_send(PollCommand::Refresh);
    }

    /// Stops the loop and waits for the task to exit.
    pub async fn stop(self) {
        let _ = self.commands.send(PollCommand::Stop).await;
        let _ = self.task.await;
    }
}

/// One poll tick: sample every mount point off the async workers, then
/// apply. Returns the number of status changes emitted.
pub async fn poll_once(manager: &MountManager) -> usize {
    let targets = manager.poll_targets();
    if targets.is_empty() {
        return manager.apply_samples(Vec::new());
    }
    let table = manager.mount_table();
    let sampled = tokio::task::spawn_blocking(move || {
        targets
            .into_iter()
            .map(|t| {
                let mounted = table.is_mounted(&t.mount_point);
                (t, mounted)
            })
            .collect::<Vec<_>>()
    })
    .await;

    match sampled {
        Ok(samples) => manager.apply_samples(samples),
        Err(e) => {
            error!("Mount probe task failed: {e}");
            0
        }
    }
}
