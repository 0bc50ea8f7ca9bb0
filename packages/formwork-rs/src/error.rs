//! Structured error types for dispatch wiring.
//!
//! Everything here is a configuration error: it means the consumer tree is
//! wired wrong, not that the user's input is invalid. Field validation
//! failures travel as [`FieldError`](crate::FieldError) data on field state,
//! never through this enum, and a gate rejecting a value is ordinary control
//! flow with no error at all.

use thiserror::Error;

use crate::registry::FormId;

/// Errors raised by the dispatch registry and ambient binding.
#[derive(Debug, Error)]
pub enum FormError {
    /// Dispatch requested for a form that has nothing mounted.
    ///
    /// The caller must mount a form handle (the provider step) before any
    /// descendant resolves its dispatch.
    #[error("no form dispatch is mounted for form {form}; mount a FormHandle before resolving")]
    DispatchNotMounted { form: FormId },

    /// A dispatch is mounted for the form, but with a different
    /// extra-context type than the one requested.
    #[error("form {form} is mounted with a different extra-context type than the requested `{requested}`")]
    DispatchTypeMismatch {
        form: FormId,
        requested: &'static str,
    },
}
