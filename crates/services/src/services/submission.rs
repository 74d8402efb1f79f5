//! Shared machinery of the per-entity orchestrators: the submission state
//! machine, the watch-backed caches and the toast-on-outcome wrapper.

use std::{future::Future, sync::Arc};

use domain::models::Identified;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

use super::{api::ApiError, session::SessionError, toast::ToastService, validation::ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success,
    Failure,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    Busy,
    #[error("not allowed: {0}")]
    Forbidden(String),
    #[error("{0} is not loaded")]
    NotLoaded(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SubmitError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }

    /// Text for the error toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::Validation(e) => e.message.clone(),
            Self::Session(_) => SESSION_SAVE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

pub const SESSION_SAVE_MESSAGE: &str = "Could not store your session on this device";

/// `Idle -> Submitting -> {Success, Failure} -> Idle`. At most one submission
/// runs at a time.
#[derive(Debug, Clone)]
pub struct SubmissionGate {
    state: Arc<watch::Sender<SubmissionState>>,
}

impl Default for SubmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.state() == SubmissionState::Submitting
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn begin(&self) -> Result<SubmissionGuard, SubmitError> {
        let started = self.state.send_if_modified(|state| {
            if *state == SubmissionState::Submitting {
                return false;
            }
            *state = SubmissionState::Submitting;
            true
        });
        if !started {
            return Err(SubmitError::Busy);
        }
        Ok(SubmissionGuard { gate: self.clone() })
    }
}

/// Resets the gate to `Idle` when dropped.
#[derive(Debug)]
pub struct SubmissionGuard {
    gate: SubmissionGate,
}

impl SubmissionGuard {
    pub fn finish(&self, ok: bool) {
        let outcome = if ok {
            SubmissionState::Success
        } else {
            SubmissionState::Failure
        };
        self.gate.state.send_replace(outcome);
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.gate.state.send_replace(SubmissionState::Idle);
    }
}

/// A list the UI renders, replaced wholesale after every re-fetch.
#[derive(Debug)]
pub struct Collection<T> {
    items: Arc<watch::Sender<Vec<T>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Collection<T> {
    pub fn new() -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            items: Arc::new(items),
        }
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    pub fn replace(&self, items: Vec<T>) {
        self.items.send_replace(items);
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }
}

impl<T: Clone + Identified> Collection<T> {
    pub fn get(&self, id: &str) -> Option<T> {
        self.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    /// Apply `f` to the record with `id`. `f` returns whether it changed
    /// anything; the result is false when it did not or the record is not
    /// loaded.
    pub(crate) fn update_one(&self, id: &str, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.items.send_if_modified(|items| match items.iter_mut().find(|item| item.id() == id) {
            Some(item) => f(item),
            None => false,
        })
    }
}

/// A single record the UI shows (profile, cluster detail).
#[derive(Debug)]
pub struct Slot<T> {
    value: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Clone> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Slot<T> {
    pub fn new() -> Self {
        let (value, _) = watch::channel(None);
        Self {
            value: Arc::new(value),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.value.subscribe()
    }

    pub fn set(&self, value: T) {
        self.value.send_replace(Some(value));
    }

    pub fn clear(&self) {
        self.value.send_replace(None);
    }
}

/// Runs API calls behind a `SubmissionGate` and turns outcomes into toasts.
#[derive(Debug, Clone)]
pub struct Submitter {
    gate: SubmissionGate,
    toasts: ToastService,
}

impl Submitter {
    pub fn new(toasts: ToastService) -> Self {
        Self {
            gate: SubmissionGate::new(),
            toasts,
        }
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub fn toasts(&self) -> &ToastService {
        &self.toasts
    }

    /// A mutation: gated, success toast on `Ok`, error toast on `Err`.
    pub async fn submit<T, E, F>(&self, success_message: &str, call: F) -> Result<T, SubmitError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<SubmitError>,
    {
        let guard = self.gate.begin()?;
        match call.await {
            Ok(value) => {
                guard.finish(true);
                self.toasts.success(success_message);
                Ok(value)
            }
            Err(e) => {
                let e = e.into();
                guard.finish(false);
                warn!(error = %e, "Submission failed");
                self.toasts.error(e.user_message());
                Err(e)
            }
        }
    }

    /// A read: not gated, error toast on failure only.
    pub async fn fetch<T, F>(&self, call: F) -> Result<T, SubmitError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        call.await.map_err(|e| {
            warn!(error = %e, "Fetch failed");
            self.toasts.error(e.user_message());
            SubmitError::Api(e)
        })
    }

    /// Re-fetch after a successful mutation. The mutation was already
    /// toasted, so a failed refresh is logged and yields `None`.
    pub async fn refresh<T, F>(&self, what: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match call.await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(what, error = %e, "Refresh after submission failed");
                None
            }
        }
    }
}
