//! # Formwork
//!
//! Composable form actions and gated controlled fields over a pluggable
//! form-state manager.
//!
//! ## Core Concepts
//!
//! Formwork separates **business logic** from **field state**:
//! - [`FormAction`] = a unit of form business logic, run through dispatch
//! - [`FormAccessor`] = the capability set the external manager supplies
//!
//! The manager owns every value and error; this crate only routes intent to
//! it. Two subsystems cover that routing:
//!
//! 1. **Action dispatch** — [`FormDispatch`] executes actions against the
//!    accessor plus a caller-defined extra context, and every action can
//!    dispatch further actions with identical capabilities.
//! 2. **Controlled fields** — [`ControlledField`] wraps a per-field
//!    controller with an optional asynchronous admission gate, an external
//!    change callback, and merged element refs.
//!
//! ## Architecture
//!
//! ```text
//! FormHandle::new(accessor, extra)
//!     │
//!     ├─► FormDispatch ──► dispatch(action) ──► ActionContext
//!     │         ▲                                   │
//!     │         │            nested dispatch        │
//!     │         └───────────────────────────────────┘
//!     │
//!     └─► mount(&registry) ──► FormId ──► ActionDef::bind(...)
//!
//! UI event ──► ControlledField::on_change(proposed)
//!                  │
//!                  ├─ no gate ──► apply (internal, then external)
//!                  │
//!                  └─ gate ──► spawned admit(proposed, current)
//!                                  ├─ true  ──► apply
//!                                  └─ false ──► drop silently
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Dispatch is transparent** - actions run exactly once, synchronously,
//!    and their results, errors, and panics pass through untouched
//! 2. **Context is stable** - every level of a dispatch tree sees the same
//!    accessor and the identical extra context
//! 3. **Missing providers fail loudly** - resolving an unmounted form is a
//!    configuration error, never a silent default
//! 4. **Internal before external** - an admitted change updates the
//!    controller before the external callback observes it
//! 5. **No admission ordering** - overlapping gated changes resolve
//!    independently; the last resolution wins
//!
//! ## Example
//!
//! ```ignore
//! use formwork::{
//!     ActionContext, ActionDef, ComposeOptions, DispatchRegistry, FieldComposer,
//!     FieldRules, FormHandle, gate_fn,
//! };
//! use serde_json::json;
//!
//! // 1. Wire the form: manager accessor + extra context, mounted for consumers
//! let registry = DispatchRegistry::new();
//! let handle = FormHandle::new(manager.accessor(), Services { api });
//! let guard = handle.mount(&registry);
//!
//! // 2. Define reusable actions
//! let submit = ActionDef::new(|props: SubmitProps, ctx: ActionContext<Services>| async move {
//!     if !ctx.trigger(None, Default::default()).await {
//!         return Err(anyhow::anyhow!("validation failed"));
//!     }
//!     ctx.extra().api.save(ctx.get_values(None)).await
//! });
//!
//! // 3. Bind and call from any consumer below the mount
//! let on_submit = submit.bind(&registry, guard.form())?;
//! on_submit.call(SubmitProps::default()).await?;
//!
//! // 4. Compose a gated controlled field
//! let composer = FieldComposer::new(FieldRules::required("name is required"));
//! let field = composer.compose(
//!     &control,
//!     ComposeOptions::new("name")
//!         .with_default_value(json!(""))
//!         .with_gate(gate_fn(|proposed: &_, _current: &_| proposed != "forbidden")),
//! );
//! field.on_change(json!("fine"));
//! ```
//!
//! ## What This Is Not
//!
//! Formwork is **not**:
//! - A form-state manager (values, errors, and validation live behind
//!   [`FormAccessor`])
//! - A validation library (rules are merged and forwarded, not interpreted)
//! - A rendering layer (fields expose callbacks; something else draws them)

mod accessor;
mod action;
mod compose;
mod controller;
mod dispatch;
mod error;
mod form;
mod gate;
mod refs;
mod registry;

// Testing utilities (feature-gated; also compiled for this crate's tests)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Cross-module flow tests (test-only)
#[cfg(test)]
mod flow_tests;

// Re-export accessor boundary types
pub use accessor::{FieldError, FieldState, FormAccessor, TriggerOptions};

// Re-export dispatch types
pub use dispatch::{ActionContext, FormAction, FormDispatch};

// Re-export action binder types
pub use action::{bind_action, ActionDef, BoundAction};

// Re-export registry types
pub use registry::{DispatchGuard, DispatchRegistry, FormId};

// Re-export form wiring
pub use form::FormHandle;

// Re-export controlled-field types
pub use controller::{ChangeTicket, ControlledField, FieldController};

// Re-export gate types
pub use gate::{gate_boxed, gate_fn, ChangeGate};

// Re-export ref types
pub use refs::{ElementHandle, FieldRef, MergedRefs};

// Re-export composition types
pub use compose::{
    ComposeOptions, FieldComposer, FieldRegistration, FieldRules, FormControl, Validator,
    Validators,
};

// Re-export error types
pub use error::FormError;

// Re-export commonly used external types
pub use async_trait::async_trait;
