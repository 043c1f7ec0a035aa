//! Field-level validation accumulator.
//!
//! A [`FieldValidator`] collects every failed check of a validation pass so a
//! single response can report all offending fields at once.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::ValidateEmail;

use crate::error::AppError;

/// Failed checks keyed by field name, messages kept in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn push(&mut self, field: &str, message: String) {
        self.0.entry(field.to_string()).or_default().push(message);
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: FieldErrors,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(field, message.into());
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    /// Finish the pass, turning any accumulated failures into a 422.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.valid() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Length in Unicode scalar values, the unit user-facing limits are stated in.
pub fn rune_count(s: &str) -> usize {
    s.chars().count()
}

pub fn is_email(s: &str) -> bool {
    s.validate_email()
}
