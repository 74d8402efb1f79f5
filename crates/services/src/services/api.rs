//! The REST boundary: request description, error taxonomy and the
//! `Transport` seam the typed client is written against.

use async_trait::async_trait;
use bytes::Bytes;
use domain::models::upload::FileUpload;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utils::response::EnvelopeError;

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}")]
    Http {
        status: u16,
        message: Option<String>,
    },
    #[error("server rejected the request")]
    Rejected { message: Option<String> },
    #[error("response is missing `{0}`")]
    MissingField(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Message carried by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } | Self::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }

    /// Text for an error toast: server message, then the error itself, then a
    /// generic fallback.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        match self {
            Self::Transport(reason) if !reason.is_empty() => format!("Network error: {reason}"),
            Self::Timeout => "The server took too long to answer".to_string(),
            Self::Unauthenticated => "Your session has expired, please sign in again".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Rejected { message } => ApiError::Rejected { message },
            EnvelopeError::MissingField(field) => ApiError::MissingField(field),
            EnvelopeError::Malformed { field, reason } => {
                ApiError::Serde(format!("{field}: {reason}"))
            }
        }
    }
}

/// Text fields plus file parts of a multipart body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, FileUpload)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn text_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: &str, file: FileUpload) -> Self {
        self.files.push((name.to_string(), file));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// One REST call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Serde(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn is_idempotent(&self) -> bool {
        self.method == Method::GET
    }
}

/// Anything able to carry an `ApiRequest` to the Kivora API.
///
/// `execute` yields the decoded JSON body of a 2xx answer; envelope
/// interpretation happens in the typed client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError>;

    /// Binary downloads (PDF exports).
    async fn download(&self, request: ApiRequest) -> Result<Bytes, ApiError>;
}
