//! Form dispatch: executes actions against the accessor and extra context.
//!
//! A [`FormDispatch`] pairs an accessor with an extra-context value and runs
//! [`FormAction`]s against them. Every dispatch hands the action a fresh
//! [`ActionContext`] carrying the same two `Arc`s, so nested dispatches are
//! indistinguishable in capability from the outer one.
//!
//! # Key Properties
//!
//! - **Synchronous invocation**: `dispatch` calls the action exactly once and
//!   returns whatever it returns. An async action returns its pending future
//!   untouched; the caller decides whether to await it.
//! - **No error translation**: `Err` returns and panics from the action body
//!   reach the dispatch caller unchanged. There is no catching, logging, or
//!   wrapping in this layer.
//! - **Stable context identity**: the accessor and extra context are shared
//!   by `Arc`, so every level of a dispatch tree observes the same instances.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::accessor::{FieldError, FieldState, FormAccessor, TriggerOptions};

/// A unit of form business logic, executable through [`FormDispatch`].
///
/// Implemented for every `FnOnce(ActionContext<X>) -> R`, so plain closures
/// and async closures are actions:
///
/// ```ignore
/// // Synchronous action
/// dispatch.dispatch(|ctx: ActionContext<()>| {
///     ctx.set_value("name", json!("demo"));
/// });
///
/// // Async action: dispatch returns the pending future, the caller awaits
/// let valid = dispatch
///     .dispatch(|ctx: ActionContext<()>| async move {
///         ctx.trigger(None, TriggerOptions::default()).await
///     })
///     .await;
/// ```
pub trait FormAction<X> {
    /// What the action returns through `dispatch`.
    type Output;

    /// Run the action body with its accessor view.
    fn run(self, ctx: ActionContext<X>) -> Self::Output;
}

impl<X, F, R> FormAction<X> for F
where
    F: FnOnce(ActionContext<X>) -> R,
{
    type Output = R;

    fn run(self, ctx: ActionContext<X>) -> R {
        self(ctx)
    }
}

/// Executes form actions against an accessor and an extra-context value.
///
/// This is the explicit value type behind the dispatch capability: cheap to
/// clone, immutable, and safe to hand to any consumer that needs to run
/// actions. Clones are semantically identical.
///
/// # Example
///
/// ```ignore
/// let dispatch = FormDispatch::new(accessor, Services { api });
///
/// let outcome = dispatch.dispatch(|ctx: ActionContext<Services>| {
///     ctx.set_value("status", json!("submitted"));
///     ctx.extra().api.notify();
///     "done"
/// });
/// assert_eq!(outcome, "done");
/// ```
pub struct FormDispatch<X> {
    accessor: Arc<dyn FormAccessor>,
    extra: Arc<X>,
}

impl<X: Send + Sync + 'static> FormDispatch<X> {
    /// Create a dispatch over an accessor and an extra-context value.
    pub fn new(accessor: Arc<dyn FormAccessor>, extra: X) -> Self {
        Self {
            accessor,
            extra: Arc::new(extra),
        }
    }

    /// Create a dispatch from a pre-shared extra context.
    ///
    /// Use this when the same extra context is shared with other parts of
    /// the system.
    pub fn from_arc(accessor: Arc<dyn FormAccessor>, extra: Arc<X>) -> Self {
        Self { accessor, extra }
    }

    /// Execute an action and return its result.
    ///
    /// The action is invoked synchronously, exactly once, with a fresh
    /// [`ActionContext`] referring to this dispatch's accessor and extra
    /// context. The return value is passed through untouched, pending
    /// futures included.
    pub fn dispatch<A: FormAction<X>>(&self, action: A) -> A::Output {
        trace!("dispatching form action");
        action.run(ActionContext {
            accessor: self.accessor.clone(),
            extra: self.extra.clone(),
        })
    }

    /// The accessor this dispatch executes against.
    pub fn accessor(&self) -> &Arc<dyn FormAccessor> {
        &self.accessor
    }

    /// The extra context handed to every action.
    pub fn extra(&self) -> &X {
        &self.extra
    }
}

impl<X> Clone for FormDispatch<X> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl<X> std::fmt::Debug for FormDispatch<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDispatch").finish_non_exhaustive()
    }
}

/// Accessor view passed to action bodies.
///
/// Bundles the accessor's eight capabilities with a `dispatch` for nested
/// actions and the extra context. Immutable and cheap to clone; clones MUST
/// be semantically identical, which is what makes handing the context into
/// spawned futures safe.
///
/// Nested dispatches construct a fresh inner dispatch per call, bound to the
/// same accessor and the identical extra-context value, so there is no hidden
/// shared mutable dispatch state between levels.
pub struct ActionContext<X> {
    pub(crate) accessor: Arc<dyn FormAccessor>,
    pub(crate) extra: Arc<X>,
}

impl<X: Send + Sync + 'static> ActionContext<X> {
    /// Dispatch a nested action.
    ///
    /// The inner action sees the same accessor and the identical extra
    /// context as this one.
    pub fn dispatch<A: FormAction<X>>(&self, action: A) -> A::Output {
        FormDispatch::from_arc(self.accessor.clone(), self.extra.clone()).dispatch(action)
    }

    /// A dispatch handle bound to this context's accessor and extra context,
    /// for handing onward.
    pub fn form_dispatch(&self) -> FormDispatch<X> {
        FormDispatch::from_arc(self.accessor.clone(), self.extra.clone())
    }

    /// The caller-supplied extra context.
    pub fn extra(&self) -> &X {
        &self.extra
    }

    /// The underlying accessor.
    pub fn accessor(&self) -> &Arc<dyn FormAccessor> {
        &self.accessor
    }

    /// Read the whole form record (`None`) or a single field's value.
    pub fn get_values(&self, path: Option<&str>) -> Value {
        self.accessor.get_values(path)
    }

    /// Write a field's value.
    pub fn set_value(&self, path: &str, value: Value) {
        self.accessor.set_value(path, value)
    }

    /// Attach a validation error to a field.
    pub fn set_error(&self, path: &str, error: FieldError) {
        self.accessor.set_error(path, error)
    }

    /// Clear a field's error, or every error (`None`).
    pub fn clear_errors(&self, path: Option<&str>) {
        self.accessor.clear_errors(path)
    }

    /// Run validation for one field or the whole form (`None`).
    pub async fn trigger(&self, path: Option<&str>, options: TriggerOptions) -> bool {
        self.accessor.trigger(path, options).await
    }

    /// Reset the form to its defaults, or to the given record.
    pub fn reset(&self, values: Option<Value>) {
        self.accessor.reset(values)
    }

    /// Reset a single field to its default.
    pub fn reset_field(&self, path: &str) {
        self.accessor.reset_field(path)
    }

    /// Read a field's validation state.
    pub fn get_field_state(&self, path: &str) -> FieldState {
        self.accessor.get_field_state(path)
    }
}

impl<X> Clone for ActionContext<X> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl<X> std::fmt::Debug for ActionContext<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext").finish_non_exhaustive()
    }
}
