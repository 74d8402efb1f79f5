//! Client-side validation. Nothing here touches the network: a failing rule
//! blocks the submission and is reported next to the offending field.

use std::fmt;

pub mod field;
pub mod forms;

pub use field::{FieldInput, FieldKind};
pub use forms::{
    validate_password_change, validate_profile, validate_profile_picture, Validate,
};

/// Validation error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    Required,
    InvalidFormat,
    InvalidEmail,
    WeakPassword,
    InvalidLength,
    TooLong,
    /// New value must differ from the current one
    Unchanged,
    InvalidDateRange,
    InPast,
    InvalidUrl,
    UnsupportedType,
    TooLarge,
    TooMany,
    NotMember,
    NotEligible,
}

/// First failing rule of a form, with the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Option<&'static str>,
    pub code: ValidationErrorCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: None,
            code,
            message: message.into(),
        }
    }

    pub fn for_field(
        field: &'static str,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field),
            code,
            message: message.into(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::for_field(
            field,
            ValidationErrorCode::Required,
            format!("The {field} field is required"),
        )
    }

    pub fn too_long(field: &'static str, max: usize) -> Self {
        Self::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("The {field} field must not exceed {max} characters"),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// `Ok` when the trimmed value is present.
pub fn check_required<'a>(
    field: &'static str,
    value: impl Into<FieldInput<'a>>,
) -> Result<(), ValidationError> {
    match value.into().present() {
        Some(_) => Ok(()),
        None => Err(ValidationError::required(field)),
    }
}

/// `Ok` when the value is missing or at most `max` characters long.
pub fn check_max_len<'a>(
    field: &'static str,
    value: impl Into<FieldInput<'a>>,
    max: usize,
) -> Result<(), ValidationError> {
    if value.into().char_len() > max {
        Err(ValidationError::too_long(field, max))
    } else {
        Ok(())
    }
}
