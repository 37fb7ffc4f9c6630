//! Shared deterministic types for the form engine.
//!
//! These types define stable contracts between core components and the
//! adapters in [`crate::io`]. They do not depend on external state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value held by a single field.
///
/// Scalar inputs (text, selects, radio choices, file names) hold `Text`;
/// checkbox groups and repeated inputs hold `Many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Many(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Many(values.into_iter().map(Into::into).collect())
    }

    /// Scalar form of the value, `None` for list values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Many(_) => None,
        }
    }

    /// True when the value carries no user input.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            Self::Many(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Flat field name to value mapping, ordered for deterministic output.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Grouped projection of the field map (group name to field map).
pub type GroupedData = BTreeMap<String, FieldMap>;

/// Category of a failed validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Required,
    InvalidFormat,
    InvalidValue,
    Dependency,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::InvalidFormat => "invalidFormat",
            Self::InvalidValue => "invalidValue",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One failed field, as displayed inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub kind: ErrorKind,
    /// Field named by a failed dependency rule.
    pub depends_on: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
            depends_on: None,
        }
    }

    pub fn dependency(field: impl Into<String>, depends_on: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::Dependency,
            depends_on: Some(depends_on.into()),
        }
    }

    /// Inline message shown in the field's error slot.
    pub fn message(&self) -> String {
        match self.kind {
            ErrorKind::Required => "This field is required".to_string(),
            ErrorKind::InvalidFormat => "Invalid format".to_string(),
            ErrorKind::InvalidValue => "Invalid value".to_string(),
            ErrorKind::Dependency => format!(
                "This field depends on {}",
                self.depends_on.as_deref().unwrap_or("another field")
            ),
        }
    }
}

/// Outcome of validating every field of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: u32,
    pub is_valid: bool,
    /// At most one error per field, in document order.
    pub errors: Vec<ValidationError>,
    /// First field in document order that failed any check.
    pub first_invalid: Option<String>,
}

impl StepReport {
    pub fn error_for(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|err| err.field == field)
    }
}
