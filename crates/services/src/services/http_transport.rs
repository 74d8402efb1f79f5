//! reqwest-backed `Transport` with bearer auth and retry of idempotent calls.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode, multipart};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use utils::response::extract_message;
use uuid::Uuid;

use super::{
    api::{ApiError, ApiRequest, MultipartForm, RequestBody, Transport},
    config::ClientConfig,
    session::SessionStore,
};

#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    session: Arc<dyn SessionStore>,
    max_retries: usize,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("kivora/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let base_url = normalize_base(&config.api_base_url)?;

        Ok(Self {
            http,
            base_url,
            session,
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{path}: {e}")))
    }

    fn build(&self, request: &ApiRequest, request_id: Uuid) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header("x-request-id", request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(form) => builder.multipart(to_multipart(form)?),
        };
        Ok(builder)
    }

    async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4();
        debug!(
            method = %request.method,
            path = %request.path,
            request_id = %request_id,
            "Sending API request"
        );

        let res = self
            .build(request, request_id)?
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| extract_message(&v));
        match status {
            StatusCode::UNAUTHORIZED if message.is_none() => Err(ApiError::Unauthenticated),
            s => Err(ApiError::Http {
                status: s.as_u16(),
                message,
            }),
        }
    }

    async fn send_json(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let res = self.send(request).await?;
        let body = res.bytes().await.map_err(map_reqwest_error)?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::Serde(e.to_string()))
    }

    async fn send_bytes(&self, request: &ApiRequest) -> Result<Bytes, ApiError> {
        self.send(request)
            .await?
            .bytes()
            .await
            .map_err(map_reqwest_error)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(10))
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        if !request.is_idempotent() {
            return self.send_json(&request).await;
        }

        (|| async { self.send_json(&request).await })
            .retry(self.backoff())
            .when(|e: &ApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "API call {} failed, retrying after {:.2}s: {}",
                    request.path,
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn download(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
        (|| async { self.send_bytes(&request).await })
            .retry(self.backoff())
            .when(|e: &ApiError| e.should_retry() && request.is_idempotent())
            .await
    }
}

/// The base must end in `/` for relative joins to keep its path.
fn normalize_base(raw: &str) -> Result<Url, ApiError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| ApiError::InvalidRequest(format!("base url {raw}: {e}")))
}

fn to_multipart(form: &MultipartForm) -> Result<multipart::Form, ApiError> {
    let mut out = multipart::Form::new();
    for (name, value) in &form.fields {
        out = out.text(name.clone(), value.clone());
    }
    for (name, file) in &form.files {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {e}", file.file_name)))?;
        out = out.part(name.clone(), part);
    }
    Ok(out)
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}
