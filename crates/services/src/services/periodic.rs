//! Start/stop/visibility lifecycle shared by the background services.

use std::{future::Future, sync::Mutex, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A fixed-interval loop that can be cancelled and paused.
///
/// Each tick is awaited before the next one is considered and missed ticks
/// are skipped, so two ticks never overlap. While hidden the loop keeps its
/// timer but does no work; becoming visible again ticks immediately.
pub struct Periodic {
    name: &'static str,
    period: Duration,
    visible: watch::Sender<bool>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for Periodic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Periodic")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("visible", &*self.visible.borrow())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Periodic {
    pub fn new(name: &'static str, period: Duration) -> Self {
        let (visible, _) = watch::channel(true);
        Self {
            name,
            period,
            visible,
            running: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.send_if_modified(|current| {
            let changed = *current != visible;
            *current = visible;
            changed
        });
    }

    /// Spawn the loop. Returns false if it is already running.
    pub fn start<F, Fut>(&self, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let token = CancellationToken::new();
        let name = self.name;
        let period = self.period;
        let mut visible = self.visible.subscribe();
        let cancelled = token.clone();

        info!("Starting {} with interval {:?}", name, period);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    changed = visible.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *visible.borrow_and_update() {
                            ticker.reset_immediately();
                        }
                    }
                    _ = ticker.tick() => {
                        if !*visible.borrow() {
                            debug!("{} paused while hidden", name);
                            continue;
                        }
                        tokio::select! {
                            _ = cancelled.cancelled() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            debug!("{} stopped", name);
        });

        *running = Some(Running { token, handle });
        true
    }

    /// Cancel the loop and wait for it to exit. An in-flight tick is dropped.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(Running { token, handle }) = running {
            token.cancel();
            let _ = handle.await;
            info!("Stopped {}", self.name);
        }
    }
}

impl Drop for Periodic {
    fn drop(&mut self) {
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            running.token.cancel();
        }
    }
}
