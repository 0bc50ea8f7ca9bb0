//! Accessor boundary to the external form-state manager.
//!
//! The form-state manager owns all field values and validation state.
//! This crate never copies or persists that state; it holds an
//! `Arc<dyn FormAccessor>` and invokes the capability set through it.
//!
//! # Key Properties
//!
//! - **Eight capabilities**: read values, write a value, set/clear errors,
//!   trigger validation, reset (whole form or one field), read field state.
//! - **Interior mutability**: every method takes `&self`. Implementations
//!   must tolerate re-entrant calls, since nested dispatches and pending
//!   gate resolutions share the same accessor.
//! - **Dynamic values**: the form record is path-keyed `serde_json::Value`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A validation error attached to a single field.
///
/// `kind` is a short machine-readable tag (`required`, `min`,
/// `validate:<name>`, ...); `message` is the human-readable text, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: String,
    pub message: Option<String>,
}

impl FieldError {
    /// Create an error with a kind and no message.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: None,
        }
    }

    /// Create an error with a kind and a message.
    pub fn with_message(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Validation state and metadata for a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    /// The field's value differs from its default.
    pub is_dirty: bool,
    /// The field has received a blur event.
    pub is_touched: bool,
    /// The field currently fails validation.
    pub invalid: bool,
    /// The current validation error, if any.
    pub error: Option<FieldError>,
}

/// Options for a validation trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerOptions {
    /// Focus the first failing field after validation.
    pub should_focus: bool,
}

/// Capability set supplied by the external form-state manager.
///
/// Actions receive these methods (plus `dispatch`) through
/// [`ActionContext`](crate::ActionContext); they are the only way the
/// dispatch layer touches form state.
///
/// # Example
///
/// ```ignore
/// let form: Arc<dyn FormAccessor> = my_manager.accessor();
///
/// form.set_value("email", json!("a@b.c"));
/// let valid = form.trigger(Some("email"), TriggerOptions::default()).await;
/// if !valid {
///     let state = form.get_field_state("email");
///     println!("email invalid: {:?}", state.error);
/// }
/// ```
#[async_trait]
pub trait FormAccessor: Send + Sync + 'static {
    /// Read the whole form record (`None`) or a single field's value.
    ///
    /// A missing field reads as `Value::Null`.
    fn get_values(&self, path: Option<&str>) -> Value;

    /// Write a field's value.
    fn set_value(&self, path: &str, value: Value);

    /// Attach a validation error to a field.
    fn set_error(&self, path: &str, error: FieldError);

    /// Clear a field's error, or every error (`None`).
    fn clear_errors(&self, path: Option<&str>);

    /// Run validation for one field or the whole form (`None`).
    ///
    /// Returns `true` when everything validated is currently valid.
    async fn trigger(&self, path: Option<&str>, options: TriggerOptions) -> bool;

    /// Reset the form to its defaults, or to the given record.
    fn reset(&self, values: Option<Value>);

    /// Reset a single field to its default.
    fn reset_field(&self, path: &str);

    /// Read a field's validation state.
    fn get_field_state(&self, path: &str) -> FieldState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display_with_message() {
        let error = FieldError::with_message("required", "name is required");
        assert_eq!(error.to_string(), "required: name is required");
    }

    #[test]
    fn field_error_display_without_message() {
        let error = FieldError::new("min");
        assert_eq!(error.to_string(), "min");
    }

    #[test]
    fn field_state_default_is_pristine() {
        let state = FieldState::default();
        assert!(!state.is_dirty);
        assert!(!state.is_touched);
        assert!(!state.invalid);
        assert!(state.error.is_none());
    }

    #[test]
    fn field_error_roundtrips_through_serde() {
        let error = FieldError::with_message("validate:unique", "already taken");
        let json = serde_json::to_string(&error).unwrap();
        let back: FieldError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }
}
