//! Terminal output helpers.

use domain::models::{backlog::BacklogItem, notification::Notification};
use services::services::toast::{Toast, ToastLevel};

pub fn success(msg: &str) {
    println!("✓ {msg}");
}

pub fn error(msg: &str) {
    eprintln!("✗ {msg}");
}

pub fn info(msg: &str) {
    println!("ℹ {msg}");
}

pub fn toast(toast: &Toast) {
    match toast.level {
        ToastLevel::Success => success(&toast.message),
        ToastLevel::Error => error(&toast.message),
        ToastLevel::Info => info(&toast.message),
    }
}

pub fn print_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        info("No notifications");
        return;
    }
    for n in notifications {
        let marker = if n.is_pending() { "●" } else { " " };
        println!("{marker} {:<12} {}  {}", n.state.to_string(), n.title, n.message);
    }
}

pub fn print_backlog(items: &[BacklogItem]) {
    if items.is_empty() {
        info("The backlog is empty");
        return;
    }
    println!("{:<26} {:<8} {:<10} TITLE", "ID", "PRIORITY", "STATE");
    for item in items {
        println!(
            "{:<26} {:<8} {:<10} {}",
            item.id,
            item.priority.as_u8(),
            format!("{:?}", item.state),
            item.title
        );
    }
}
