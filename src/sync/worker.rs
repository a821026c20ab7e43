use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval};

use super::{DrainReport, SyncTrigger};
use crate::context::WellnessContext;
use crate::error::AppResult;

/// Sending side of the worker's trigger channel.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncTrigger>,
}

impl SyncHandle {
    /// Returns false when the request was coalesced into an already pending drain
    /// or the worker has stopped.
    pub fn request(&self, trigger: SyncTrigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(?trigger, "Drain already pending, request coalesced");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(?trigger, "Sync worker stopped, request dropped");
                false
            }
        }
    }
}

/// Start the background drain loop. It wakes on explicit triggers and, when
/// `interval_secs` is non-zero, on a fixed schedule. The loop ends once every
/// [`SyncHandle`] is dropped.
pub fn spawn_sync_worker(
    ctx: Arc<WellnessContext>,
    events: broadcast::Sender<String>,
    interval_secs: u64,
) -> (SyncHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SyncTrigger>(1);

    let mut ticker: Option<Interval> = (interval_secs > 0).then(|| {
        let period = Duration::from_secs(interval_secs);
        interval_at(Instant::now() + period, period)
    });

    let handle = tokio::spawn(async move {
        loop {
            let tick = async {
                match ticker.as_mut() {
                    Some(t) => {
                        t.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            let trigger = tokio::select! {
                received = rx.recv() => match received {
                    Some(trigger) => trigger,
                    None => break,
                },
                _ = tick => SyncTrigger::Interval,
            };

            // Failures are logged inside; the next trigger retries.
            let _ = drain_and_notify(&ctx, &events, trigger).await;
        }
        tracing::debug!("Sync worker stopped");
    });

    (SyncHandle { tx }, handle)
}

/// Drain the outbox and tell WebSocket clients when anything was delivered.
pub async fn drain_and_notify(
    ctx: &WellnessContext,
    events: &broadcast::Sender<String>,
    trigger: SyncTrigger,
) -> AppResult<DrainReport> {
    let report = match ctx.drain().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(?trigger, error = %e, "Outbox drain failed");
            return Err(e);
        }
    };

    if report.attempted > 0 {
        tracing::info!(
            ?trigger,
            delivered = report.delivered,
            failed = report.failed,
            remaining = report.remaining,
            "Outbox drained"
        );
    }
    if report.delivered > 0 {
        let msg = serde_json::json!({
            "type": "entries_synced",
            "delivered": report.delivered,
            "remaining": report.remaining,
        });
        // No subscribers is fine.
        let _ = events.send(msg.to_string());
    }
    Ok(report)
}
