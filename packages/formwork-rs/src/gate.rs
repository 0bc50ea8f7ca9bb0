//! Admission predicates for controlled-field value changes.
//!
//! A [`ChangeGate`] decides whether a proposed value replaces the current
//! one. Gates are pure predicates as far as the field is concerned: a
//! `false` outcome silently drops the proposal, it is never an error.
//!
//! Synchronous predicates and pending asynchronous ones are treated
//! uniformly by making the trait async; [`gate_fn`] lifts a plain closure,
//! [`gate_boxed`] lifts a future-returning one.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Decides whether a proposed field value is admitted.
#[async_trait]
pub trait ChangeGate<V>: Send + Sync + 'static {
    /// `true` admits `proposed`; `false` drops it.
    ///
    /// `current` is the field value captured when the change was proposed,
    /// not when the evaluation resolves.
    async fn admit(&self, proposed: &V, current: &V) -> bool;
}

/// Lift a synchronous predicate into a gate.
///
/// ```ignore
/// let only_t = gate_fn(|proposed: &String, _current: &String| proposed == "t");
/// ```
pub fn gate_fn<V, F>(predicate: F) -> Arc<dyn ChangeGate<V>>
where
    V: Send + Sync + 'static,
    F: Fn(&V, &V) -> bool + Send + Sync + 'static,
{
    Arc::new(FnGate { predicate })
}

struct FnGate<F> {
    predicate: F,
}

#[async_trait]
impl<V, F> ChangeGate<V> for FnGate<F>
where
    V: Send + Sync + 'static,
    F: Fn(&V, &V) -> bool + Send + Sync + 'static,
{
    async fn admit(&self, proposed: &V, current: &V) -> bool {
        (self.predicate)(proposed, current)
    }
}

/// Lift a future-returning predicate into a gate.
///
/// The closure receives owned values so the returned future does not borrow
/// from the call.
///
/// ```ignore
/// let remote = gate_boxed(|proposed: String, _current: String| {
///     async move { check_with_server(&proposed).await }.boxed()
/// });
/// ```
pub fn gate_boxed<V, F>(predicate: F) -> Arc<dyn ChangeGate<V>>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(V, V) -> BoxFuture<'static, bool> + Send + Sync + 'static,
{
    Arc::new(BoxedGate { predicate })
}

struct BoxedGate<F> {
    predicate: F,
}

#[async_trait]
impl<V, F> ChangeGate<V> for BoxedGate<F>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(V, V) -> BoxFuture<'static, bool> + Send + Sync + 'static,
{
    async fn admit(&self, proposed: &V, current: &V) -> bool {
        (self.predicate)(proposed.clone(), current.clone()).await
    }
}
