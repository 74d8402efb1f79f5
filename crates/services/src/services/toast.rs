//! Transient user-facing notifications ("toasts") emitted by orchestrators.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

const TOAST_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Fan-out of toasts to whatever front-end is listening. Every toast is also
/// logged, so nothing is lost when nobody subscribes.
#[derive(Debug, Clone)]
pub struct ToastService {
    sender: broadcast::Sender<Toast>,
}

impl Default for ToastService {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastService {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(TOAST_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(ToastLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(ToastLevel::Error, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(ToastLevel::Info, message.into());
    }

    fn emit(&self, level: ToastLevel, message: String) {
        match level {
            ToastLevel::Error => warn!(toast = %message, "Error toast"),
            _ => info!(toast = %message, level = ?level, "Toast"),
        }
        // No receivers is fine: the log line above is the fallback.
        let _ = self.sender.send(Toast { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_toasts() {
        let toasts = ToastService::new();
        let mut rx = toasts.subscribe();
        toasts.success("Saved");
        toasts.error("Failed");

        assert_eq!(rx.try_recv().unwrap().level, ToastLevel::Success);
        let err = rx.try_recv().unwrap();
        assert_eq!(err.level, ToastLevel::Error);
        assert_eq!(err.message, "Failed");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_subscribers() {
        ToastService::new().info("nobody listening");
    }
}
