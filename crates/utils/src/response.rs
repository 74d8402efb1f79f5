//! Interpretation of the `{ error, message, <payload> }` envelope every Kivora
//! endpoint answers with.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("{}", .message.as_deref().unwrap_or("server reported an error"))]
    Rejected { message: Option<String> },
    #[error("response is missing `{0}`")]
    MissingField(String),
    #[error("malformed `{field}`: {reason}")]
    Malformed { field: String, reason: String },
}

/// A 2xx body that has not been flagged as an error.
#[derive(Debug, Clone)]
pub struct Envelope {
    body: Value,
}

impl Envelope {
    /// Reject bodies carrying `error: true` or `success: false`.
    pub fn new(body: Value) -> Result<Self, EnvelopeError> {
        let flagged_error = body.get("error").and_then(Value::as_bool) == Some(true);
        let flagged_failure = body.get("success").and_then(Value::as_bool) == Some(false);
        if flagged_error || flagged_failure {
            return Err(EnvelopeError::Rejected {
                message: extract_message(&body),
            });
        }
        Ok(Self { body })
    }

    pub fn message(&self) -> Option<String> {
        extract_message(&self.body)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Deserialize the payload stored under `key`, falling back to `data`.
    ///
    /// The key doubles as the success marker: a body with neither is a failure.
    pub fn take<T: DeserializeOwned>(mut self, key: &str) -> Result<T, EnvelopeError> {
        let (field, value) = match self.body.get_mut(key).map(Value::take) {
            Some(value) => (key, value),
            None => match self.body.get_mut("data").map(Value::take) {
                Some(value) => ("data", value),
                None => return Err(EnvelopeError::MissingField(key.to_string())),
            },
        };

        serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }

    /// Acknowledgement for operations without a payload (deletes, password change).
    pub fn acknowledge(self) -> Result<Option<String>, EnvelopeError> {
        let message = self.message();
        let succeeded = self.body.get("success").and_then(Value::as_bool) == Some(true);
        if message.is_none() && !succeeded {
            return Err(EnvelopeError::MissingField("message".to_string()));
        }
        Ok(message)
    }
}

/// Best-effort extraction of a human readable message from a JSON body.
///
/// Looks at `message`, `msg`, a string `error`, `e.message`, a string `e`,
/// then the first entry of an `errors` array.
pub fn extract_message(body: &Value) -> Option<String> {
    let direct = ["message", "msg", "error", "e"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str));
    if let Some(message) = direct.filter(|m| !m.trim().is_empty()) {
        return Some(message.to_string());
    }

    if let Some(message) = body
        .get("e")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }

    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| {
            first
                .get("msg")
                .or_else(|| first.get("message"))
                .and_then(Value::as_str)
                .or_else(|| first.as_str())
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        title: String,
    }

    #[test]
    fn test_error_flag_is_rejected_with_message() {
        let err = Envelope::new(json!({"error": true, "message": "No autorizado"})).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::Rejected {
                message: Some("No autorizado".to_string())
            }
        );
    }

    #[test]
    fn test_success_false_is_rejected() {
        assert!(Envelope::new(json!({"success": false})).is_err());
    }

    #[test]
    fn test_take_prefers_named_key_then_data() {
        let envelope = Envelope::new(json!({"backlog": {"title": "Login"}})).unwrap();
        let item: Item = envelope.take("backlog").unwrap();
        assert_eq!(item.title, "Login");

        let envelope = Envelope::new(json!({"data": {"title": "Signup"}})).unwrap();
        let item: Item = envelope.take("backlog").unwrap();
        assert_eq!(item.title, "Signup");
    }

    #[test]
    fn test_missing_marker_is_failure() {
        let envelope = Envelope::new(json!({"message": "ok"})).unwrap();
        let err = envelope.take::<Item>("backlog").unwrap_err();
        assert_eq!(err, EnvelopeError::MissingField("backlog".to_string()));
    }

    #[test]
    fn test_acknowledge_requires_message_or_success() {
        assert_eq!(
            Envelope::new(json!({"message": "Eliminado"}))
                .unwrap()
                .acknowledge()
                .unwrap(),
            Some("Eliminado".to_string())
        );
        assert!(Envelope::new(json!({"success": true})).unwrap().acknowledge().is_ok());
        assert!(Envelope::new(json!({})).unwrap().acknowledge().is_err());
    }

    #[test]
    fn test_extract_message_fallbacks() {
        assert_eq!(
            extract_message(&json!({"e": {"message": "boom"}})),
            Some("boom".to_string())
        );
        assert_eq!(
            extract_message(&json!({"errors": [{"msg": "Email inválido"}]})),
            Some("Email inválido".to_string())
        );
        assert_eq!(extract_message(&json!({"error": true})), None);
    }
}
