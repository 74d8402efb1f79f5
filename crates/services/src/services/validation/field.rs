//! Single-field predicates. Every predicate is total: missing input is
//! normalised at the boundary and simply fails.

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{Display, EnumString};

use super::{ValidationError, ValidationErrorCode};

pub const NAME_MESSAGE: &str =
    "Must be 3 to 25 letters, spaces allowed only between words";
pub const USERNAME_MESSAGE: &str =
    "Must be 3 to 30 characters: letters, digits, '_' or '.'";
pub const EMAIL_MESSAGE: &str = "Use your institutional address (@kinal.edu.gt or @kinal.org.gt)";
pub const PASSWORD_MESSAGE: &str = "At least 8 characters with an uppercase letter, a lowercase letter, a digit and one of @$!%*?&";
pub const NUMBER_MESSAGE: &str = "The phone number must have exactly 8 digits";
pub const TITLE_MESSAGE: &str = "The title is required and must not exceed 100 characters";
pub const DESCRIPTION_MESSAGE: &str =
    "The description is required and must not exceed 500 characters";

pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";
pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}+(?: +\p{L}+)*$").expect("name regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.+-]+@kinal\.(edu|org)\.gt$").expect("email regex")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{8}$").expect("number regex"));

/// Raw form input as the validators see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInput<'a>(Option<&'a str>);

impl<'a> FieldInput<'a> {
    pub fn raw(&self) -> Option<&'a str> {
        self.0
    }

    /// Trimmed value, `None` when missing or blank.
    pub fn present(&self) -> Option<&'a str> {
        self.0.map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn char_len(&self) -> usize {
        self.0.map(|v| v.trim().chars().count()).unwrap_or(0)
    }
}

impl<'a> From<&'a str> for FieldInput<'a> {
    fn from(value: &'a str) -> Self {
        Self(Some(value))
    }
}

impl<'a> From<&'a String> for FieldInput<'a> {
    fn from(value: &'a String) -> Self {
        Self(Some(value.as_str()))
    }
}

impl<'a> From<Option<&'a str>> for FieldInput<'a> {
    fn from(value: Option<&'a str>) -> Self {
        Self(value)
    }
}

impl<'a> From<&'a Option<String>> for FieldInput<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Self(value.as_deref())
    }
}

pub fn validate_name<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    let input = value.into();
    let Some(raw) = input.raw() else {
        return false;
    };
    (3..=25).contains(&raw.chars().count()) && NAME_RE.is_match(raw)
}

pub fn validate_username<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    value.into().raw().is_some_and(|v| USERNAME_RE.is_match(v))
}

pub fn validate_email<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    value.into().raw().is_some_and(|v| EMAIL_RE.is_match(v))
}

pub fn validate_password<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    let Some(password) = value.into().raw() else {
        return false;
    };
    password.chars().count() >= PASSWORD_MIN_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

pub fn validate_number<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    value.into().raw().is_some_and(|v| NUMBER_RE.is_match(v))
}

pub fn validate_title<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    let input = value.into();
    input.present().is_some() && input.char_len() <= TITLE_MAX
}

pub fn validate_description<'a>(value: impl Into<FieldInput<'a>>) -> bool {
    let input = value.into();
    input.present().is_some() && input.char_len() <= DESCRIPTION_MAX
}

/// The field validators addressable by name (used by the CLI and forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Name,
    Username,
    Email,
    Password,
    #[strum(to_string = "number", serialize = "phone")]
    Number,
    Title,
    Description,
}

impl FieldKind {
    pub fn validate<'a>(self, value: impl Into<FieldInput<'a>>) -> bool {
        match self {
            FieldKind::Name => validate_name(value),
            FieldKind::Username => validate_username(value),
            FieldKind::Email => validate_email(value),
            FieldKind::Password => validate_password(value),
            FieldKind::Number => validate_number(value),
            FieldKind::Title => validate_title(value),
            FieldKind::Description => validate_description(value),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FieldKind::Name => NAME_MESSAGE,
            FieldKind::Username => USERNAME_MESSAGE,
            FieldKind::Email => EMAIL_MESSAGE,
            FieldKind::Password => PASSWORD_MESSAGE,
            FieldKind::Number => NUMBER_MESSAGE,
            FieldKind::Title => TITLE_MESSAGE,
            FieldKind::Description => DESCRIPTION_MESSAGE,
        }
    }

    fn failure_code(self) -> ValidationErrorCode {
        match self {
            FieldKind::Email => ValidationErrorCode::InvalidEmail,
            FieldKind::Password => ValidationErrorCode::WeakPassword,
            FieldKind::Title | FieldKind::Description => ValidationErrorCode::InvalidLength,
            _ => ValidationErrorCode::InvalidFormat,
        }
    }

    /// Run the predicate for `field`, producing the co-located message on failure.
    pub fn check<'a>(
        self,
        field: &'static str,
        value: impl Into<FieldInput<'a>>,
    ) -> Result<(), ValidationError> {
        let input = value.into();
        if input.present().is_none() {
            return Err(ValidationError::required(field));
        }
        if self.validate(input) {
            Ok(())
        } else {
            Err(ValidationError::for_field(
                field,
                self.failure_code(),
                self.message(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_name_examples() {
        assert!(validate_name("Ana"));
        assert!(validate_name("José María"));
        assert!(validate_name("Ñandú  Pérez"));
        assert!(!validate_name("Al"));
        assert!(!validate_name(" Ana"));
        assert!(!validate_name("Ana "));
        assert!(!validate_name("Ana3"));
        assert!(!validate_name("Ana-María"));
        assert!(!validate_name("   "));
        assert!(!validate_name(None::<&str>));
    }

    #[test]
    fn test_email_examples() {
        assert!(validate_email("ana@kinal.edu.gt"));
        assert!(validate_email("ana@kinal.org.gt"));
        assert!(validate_email("ana.lopez+scrum@kinal.edu.gt"));
        assert!(!validate_email("ana@gmail.com"));
        assert!(!validate_email("ana@kinal.edu.gt "));
        assert!(!validate_email("@kinal.edu.gt"));
        assert!(!validate_email("ana@kinal.com.gt"));
    }

    #[test]
    fn test_password_examples() {
        assert!(validate_password("Abcdef1!"));
        assert!(!validate_password("abcdefgh"));
        assert!(!validate_password("Abcdefg1"));
        assert!(!validate_password("Abc1!"));
        assert!(!validate_password("ABCDEF1!"));
        assert!(validate_password("Abcdef1!#with extras"));
    }

    #[test]
    fn test_number_title_description() {
        assert!(validate_number("55551234"));
        assert!(!validate_number("5555-1234"));
        assert!(!validate_number("555512345"));

        assert!(validate_title("Sprint 1"));
        assert!(!validate_title("  "));
        assert!(!validate_title("x".repeat(101).as_str()));

        assert!(validate_description("Done"));
        assert!(!validate_description(&Some(String::new())));
        assert!(!validate_description(&"y".repeat(501)));
    }

    #[test]
    fn test_missing_input_never_panics() {
        let missing: Option<String> = None;
        for kind in [
            FieldKind::Name,
            FieldKind::Username,
            FieldKind::Email,
            FieldKind::Password,
            FieldKind::Number,
            FieldKind::Title,
            FieldKind::Description,
        ] {
            assert!(!kind.validate(&missing));
            let err = kind.check("field", &missing).unwrap_err();
            assert_eq!(err.code, ValidationErrorCode::Required);
        }
    }

    #[test]
    fn test_field_kind_parses_aliases() {
        assert_eq!("phone".parse::<FieldKind>().unwrap(), FieldKind::Number);
        assert_eq!("email".parse::<FieldKind>().unwrap(), FieldKind::Email);
    }

    #[test]
    fn test_check_reports_message() {
        let err = FieldKind::Email.check("email", "ana@gmail.com").unwrap_err();
        assert_eq!(err.field, Some("email"));
        assert_eq!(err.message, EMAIL_MESSAGE);
    }

    proptest! {
        #[test]
        fn prop_letter_names_in_range_are_valid(name in "[a-zA-ZáéíóúñÑ]{1,8}( [a-zA-ZáéíóúñÑ]{1,8}){0,2}") {
            let len = name.chars().count();
            prop_assert_eq!(validate_name(name.as_str()), (3..=25).contains(&len));
        }

        #[test]
        fn prop_names_with_digits_are_invalid(prefix in "[a-zA-Z]{1,10}", digit in "[0-9]", suffix in "[a-zA-Z]{0,10}") {
            let name = format!("{prefix}{digit}{suffix}");
            prop_assert!(!validate_name(name.as_str()));
        }

        #[test]
        fn prop_email_matches_institutional_pattern(local in "[a-z0-9_.+-]{1,12}", org in prop::bool::ANY) {
            let domain = if org { "org" } else { "edu" };
            let email = format!("{local}@kinal.{domain}.gt");
            prop_assert!(validate_email(email.as_str()));
            let foreign = format!("{local}@gmail.com");
            prop_assert!(!validate_email(foreign.as_str()));
        }

        #[test]
        fn prop_password_rule(p in "[a-zA-Z0-9@$!%*?&]{0,16}") {
            let expected = p.chars().count() >= 8
                && p.chars().any(|c| c.is_ascii_lowercase())
                && p.chars().any(|c| c.is_ascii_uppercase())
                && p.chars().any(|c| c.is_ascii_digit())
                && p.chars().any(|c| "@$!%*?&".contains(c));
            prop_assert_eq!(validate_password(p.as_str()), expected);
        }

        #[test]
        fn prop_validators_are_idempotent(s in "\\PC{0,40}") {
            for kind in [FieldKind::Name, FieldKind::Email, FieldKind::Password, FieldKind::Title] {
                prop_assert_eq!(kind.validate(s.as_str()), kind.validate(s.as_str()));
            }
        }
    }
}
