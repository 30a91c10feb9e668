//! Repeating ticker that drives matching cycles.
//!
//! One tokio task per matcher sleeps for the configured delay, runs a cycle
//! on the blocking pool, and goes back to sleep. The delay is measured from
//! the end of the previous cycle, so a slow cycle pushes later ticks back and
//! cycles never overlap.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ErrorPolicy;
use crate::core::error::MatchError;
use crate::core::matcher::Core;
use crate::models::{DimensionKey, DimensionValue, ParticipantId};

/// Handle to a live ticker task
///
/// Dropping the handle closes the shutdown channel, which also ends the
/// loop once any in-flight cycle completes.
pub(crate) struct Ticker {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Ticker {
    pub(crate) fn spawn<P, K, V>(
        core: Arc<Core<P, K, V>>,
        delay: Duration,
        on_error: ErrorPolicy,
    ) -> Result<Self, MatchError>
    where
        P: ParticipantId,
        K: DimensionKey,
        V: DimensionValue,
    {
        let runtime = Handle::try_current().map_err(|_| MatchError::NoRuntime)?;
        let (shutdown, signal) = watch::channel(false);
        let task = runtime.spawn(tick_loop(core, delay, on_error, signal));

        Ok(Self { shutdown, task })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) async fn stop(self) {
        // The loop may already have exited on a halt policy
        let _ = self.shutdown.send(true);

        if let Err(e) = self.task.await {
            tracing::error!("Scheduler task ended abnormally: {}", e);
        }
    }
}

async fn tick_loop<P, K, V>(
    core: Arc<Core<P, K, V>>,
    delay: Duration,
    on_error: ErrorPolicy,
    mut signal: watch::Receiver<bool>,
) where
    P: ParticipantId,
    K: DimensionKey,
    V: DimensionValue,
{
    loop {
        // Shutdown wins over an already elapsed delay
        tokio::select! {
            biased;
            _ = signal.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let cycle = Arc::clone(&core);
        let outcome = tokio::task::spawn_blocking(move || cycle.run_cycle()).await;

        let failed = match outcome {
            Ok(Ok(report)) => {
                if report.groups_formed > 0 {
                    tracing::info!(
                        "Cycle formed {} groups ({} participants), {} still waiting",
                        report.groups_formed,
                        report.participants_matched,
                        report.remaining
                    );
                }
                false
            }
            Ok(Err(e)) => {
                tracing::error!("Matching cycle failed: {}", e);
                true
            }
            Err(e) => {
                tracing::error!("Matching cycle panicked: {}", e);
                true
            }
        };

        if failed && on_error == ErrorPolicy::Halt {
            tracing::warn!("Scheduler halted after a failed cycle");
            break;
        }
    }

    tracing::info!("Scheduler stopped");
}
