//! Background service that moves loaded events through
//! Pendiente -> En Curso -> Finalizado as their start time passes.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use domain::models::event::{Event, UpdateEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{client::KivoraClient, periodic::Periodic, submission::Collection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
    /// Saved, but the local record changed while the update was in flight.
    pub superseded: usize,
    /// The previous sweep was still running.
    pub skipped: bool,
}

struct Inner {
    client: KivoraClient,
    events: Collection<Event>,
    window: TimeDelta,
    sweeping: Mutex<()>,
    periodic: Periodic,
}

impl Inner {
    async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let Ok(_sweeping) = self.sweeping.try_lock() else {
            debug!("Event sweep still running, skipping");
            return SweepReport {
                skipped: true,
                ..Default::default()
            };
        };

        let events = self.events.snapshot();
        let mut report = SweepReport {
            checked: events.len(),
            ..Default::default()
        };

        for event in events {
            if event.pending_transition(now, self.window).is_none() {
                continue;
            }
            // Earlier updates in this sweep were awaited; the list may have
            // been reloaded since the snapshot.
            let Some(event) = self.events.get(&event.id) else {
                continue;
            };
            let Some(next) = event.pending_transition(now, self.window) else {
                continue;
            };
            let expected = event.status_event;
            match self
                .client
                .update_event(&event.id, &UpdateEvent::status(next))
                .await
            {
                Ok(_) => {
                    // Stored locally only once the server has it, and only
                    // over the status the update was derived from.
                    let applied = self.events.update_one(&event.id, |e| {
                        if e.status_event != expected {
                            return false;
                        }
                        e.status_event = Some(next);
                        true
                    });
                    if !applied {
                        warn!(
                            event_id = %event.id,
                            to = %next,
                            "Event changed while its status was being saved, keeping local copy"
                        );
                        report.superseded += 1;
                        continue;
                    }
                    info!(
                        event_id = %event.id,
                        from = ?expected,
                        to = %next,
                        "Event status advanced"
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        error = %e,
                        "Failed to persist event status"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Re-evaluates every event in the shared collection on a fixed interval.
#[derive(Clone)]
pub struct EventStatusSweeper {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventStatusSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStatusSweeper")
            .field("periodic", &self.inner.periodic)
            .field("window", &self.inner.window)
            .finish()
    }
}

impl EventStatusSweeper {
    pub fn new(
        client: KivoraClient,
        events: Collection<Event>,
        window: TimeDelta,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                events,
                window,
                sweeping: Mutex::new(()),
                periodic: Periodic::new("event status sweeper", sweep_interval),
            }),
        }
    }

    pub fn start(&self) -> bool {
        let inner = Arc::downgrade(&self.inner);
        self.inner.periodic.start(move || {
            let inner = inner.upgrade();
            async move {
                if let Some(inner) = inner {
                    let report = inner.sweep_at(Utc::now()).await;
                    debug!(?report, "Event sweep finished");
                }
            }
        })
    }

    pub async fn stop(&self) {
        self.inner.periodic.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.periodic.is_running()
    }

    pub fn set_visible(&self, visible: bool) {
        self.inner.periodic.set_visible(visible);
    }

    /// One sweep against an explicit clock.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        self.inner.sweep_at(now).await
    }
}
