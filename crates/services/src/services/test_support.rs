//! Scripted transport for orchestrator tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{
    api::{ApiError, ApiRequest, Transport},
    toast::{Toast, ToastLevel},
};

type Route = (Method, String);

#[derive(Default)]
struct Script {
    /// Served first, one per call.
    queued: HashMap<Route, VecDeque<Result<Value, ApiError>>>,
    /// Served once the queue is empty.
    standing: HashMap<Route, Result<Value, ApiError>>,
    downloads: HashMap<Route, Result<Bytes, ApiError>>,
    requests: Vec<ApiRequest>,
    delay: Option<Duration>,
}

#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<Script>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.script()
            .standing
            .insert((method, path.to_string()), Ok(body));
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.script()
            .standing
            .insert((method, path.to_string()), Err(error));
    }

    pub fn respond_once(&self, method: Method, path: &str, response: Result<Value, ApiError>) {
        self.script()
            .queued
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn respond_bytes(&self, path: &str, body: &'static [u8]) {
        self.script()
            .downloads
            .insert((Method::GET, path.to_string()), Ok(Bytes::from_static(body)));
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script().requests.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.script()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.script().requests.clear();
    }

    fn record(&self, request: ApiRequest) -> (Route, Option<Duration>) {
        let mut script = self.script();
        let route = (request.method.clone(), request.path.clone());
        script.requests.push(request);
        (route, script.delay)
    }

    fn not_scripted(route: &Route) -> ApiError {
        ApiError::Http {
            status: 404,
            message: Some(format!("no script for {} {}", route.0, route.1)),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let (route, delay) = self.record(request);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script();
        if let Some(next) = script.queued.get_mut(&route).and_then(VecDeque::pop_front) {
            return next;
        }
        script
            .standing
            .get(&route)
            .cloned()
            .unwrap_or_else(|| Err(Self::not_scripted(&route)))
    }

    async fn download(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
        let (route, _) = self.record(request);
        self.script()
            .downloads
            .get(&route)
            .cloned()
            .unwrap_or_else(|| Err(Self::not_scripted(&route)))
    }
}

/// Toasts received so far, without waiting.
pub fn drain_toasts(rx: &mut broadcast::Receiver<Toast>) -> Vec<Toast> {
    let mut out = Vec::new();
    while let Ok(toast) = rx.try_recv() {
        out.push(toast);
    }
    out
}

pub fn error_toasts(toasts: &[Toast]) -> usize {
    toasts.iter().filter(|t| t.level == ToastLevel::Error).count()
}
