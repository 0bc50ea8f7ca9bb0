//! Reusable, parametrized form actions.
//!
//! [`ActionDef`] wraps an action body whose domain parameters are separate
//! from the dispatch-shaped parameters. From one definition you get:
//!
//! - an action-creator ([`ActionDef::create`]) that currys the domain props
//!   away and yields a value any dispatch can execute, and
//! - a bound callable ([`ActionDef::bound`] / [`ActionDef::bind`]) that
//!   closes over a dispatch so call sites just pass the domain props.
//!
//! Binding adds no semantics: `bound.call(props)` is exactly
//! `dispatch.dispatch(def.create(props))`.

use std::sync::Arc;

use crate::dispatch::{ActionContext, FormAction, FormDispatch};
use crate::error::FormError;
use crate::registry::{DispatchRegistry, FormId};

/// A reusable form action with curried domain props.
///
/// # Example
///
/// ```ignore
/// struct Rename { value: String }
///
/// let rename = ActionDef::new(|props: Rename, ctx: ActionContext<Services>| {
///     ctx.set_value("name", json!(props.value));
///     ctx.clear_errors(Some("name"));
/// });
///
/// // Manual dispatch through the creator:
/// dispatch.dispatch(rename.create(Rename { value: "a".into() }));
///
/// // Or bind once and call from anywhere:
/// let on_rename = rename.bound(&dispatch);
/// on_rename.call(Rename { value: "b".into() });
/// ```
pub struct ActionDef<P, X, R> {
    body: Arc<dyn Fn(P, ActionContext<X>) -> R + Send + Sync>,
}

impl<P, X, R> ActionDef<P, X, R>
where
    X: Send + Sync + 'static,
{
    /// Define an action from its body.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(P, ActionContext<X>) -> R + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
        }
    }

    /// The action-creator: curry the domain props into a dispatchable value.
    pub fn create(&self, props: P) -> impl FormAction<X, Output = R>
    where
        P: 'static,
        R: 'static,
    {
        let body = self.body.clone();
        move |ctx: ActionContext<X>| body(props, ctx)
    }

    /// Bind this action to a dispatch, yielding a reusable callable.
    pub fn bound(&self, dispatch: &FormDispatch<X>) -> BoundAction<P, X, R> {
        BoundAction {
            body: self.body.clone(),
            dispatch: dispatch.clone(),
        }
    }

    /// Bind this action to the dispatch mounted for `form` in `registry`.
    ///
    /// Fails with a configuration error when no dispatch is mounted, or when
    /// the mounted dispatch carries a different extra-context type.
    pub fn bind(
        &self,
        registry: &DispatchRegistry,
        form: FormId,
    ) -> Result<BoundAction<P, X, R>, FormError> {
        let dispatch = registry.try_resolve::<X>(form)?;
        Ok(self.bound(&dispatch))
    }
}

impl<P, X, R> Clone for ActionDef<P, X, R> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
        }
    }
}

impl<P, X, R> std::fmt::Debug for ActionDef<P, X, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDef").finish_non_exhaustive()
    }
}

/// Define a reusable action. Shorthand for [`ActionDef::new`].
pub fn bind_action<P, X, R, F>(body: F) -> ActionDef<P, X, R>
where
    X: Send + Sync + 'static,
    F: Fn(P, ActionContext<X>) -> R + Send + Sync + 'static,
{
    ActionDef::new(body)
}

/// An action bound to a dispatch.
///
/// Cheap to clone; clones call through the same action body and the same
/// dispatch, so a bound action can be handed to consumers once and reused
/// for the lifetime of the form.
pub struct BoundAction<P, X, R> {
    body: Arc<dyn Fn(P, ActionContext<X>) -> R + Send + Sync>,
    dispatch: FormDispatch<X>,
}

impl<P, X, R> BoundAction<P, X, R>
where
    X: Send + Sync + 'static,
{
    /// Run the action with the given domain props.
    pub fn call(&self, props: P) -> R {
        let body = self.body.clone();
        self.dispatch
            .dispatch(move |ctx: ActionContext<X>| body(props, ctx))
    }

    /// The dispatch this action is bound to.
    pub fn dispatch(&self) -> &FormDispatch<X> {
        &self.dispatch
    }
}

impl<P, X, R> Clone for BoundAction<P, X, R> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<P, X, R> std::fmt::Debug for BoundAction<P, X, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundAction").finish_non_exhaustive()
    }
}
