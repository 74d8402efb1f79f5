pub mod api;
pub mod app;
pub mod auth;
pub mod backlog;
pub mod client;
pub mod cluster;
pub mod config;
pub mod event;
pub mod event_status;
pub mod http_transport;
pub mod notification;
pub mod notification_poller;
pub mod periodic;
pub mod profile;
pub mod project;
pub mod session;
pub mod sprint;
pub mod submission;
pub mod task;
pub mod toast;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;
