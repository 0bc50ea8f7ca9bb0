//! Form setup: wire an accessor and extra context into a mountable dispatch.
//!
//! [`FormHandle`] is the non-rendering core of the provider step: it builds
//! the [`FormDispatch`] once per form instance and mounts it into a
//! [`DispatchRegistry`] so descendants can resolve it by [`FormId`]. The
//! returned guard tears the binding down when the form goes away.
//!
//! Re-creating a handle with a different extra context builds a new
//! dispatch; consumers holding the old one keep the old context, which is
//! the explicit analog of invalidating a memoized dispatch.

use std::sync::Arc;

use crate::accessor::FormAccessor;
use crate::dispatch::FormDispatch;
use crate::registry::{DispatchGuard, DispatchRegistry};

/// One form instance: its accessor and its dispatch.
///
/// # Example
///
/// ```ignore
/// let handle = FormHandle::new(manager.accessor(), Services { api });
/// let guard = handle.mount(&registry);
///
/// // Descendants resolve by id:
/// let dispatch = registry.resolve::<Services>(guard.form());
/// ```
pub struct FormHandle<X> {
    dispatch: FormDispatch<X>,
}

impl<X: Send + Sync + 'static> FormHandle<X> {
    /// Build a form handle over an accessor and an extra-context value.
    pub fn new(accessor: Arc<dyn FormAccessor>, extra: X) -> Self {
        Self {
            dispatch: FormDispatch::new(accessor, extra),
        }
    }

    /// Build a form handle from a pre-shared extra context.
    pub fn from_arc(accessor: Arc<dyn FormAccessor>, extra: Arc<X>) -> Self {
        Self {
            dispatch: FormDispatch::from_arc(accessor, extra),
        }
    }

    /// The form's dispatch.
    pub fn dispatch(&self) -> &FormDispatch<X> {
        &self.dispatch
    }

    /// The accessor the dispatch executes against.
    pub fn accessor(&self) -> &Arc<dyn FormAccessor> {
        self.dispatch.accessor()
    }

    /// Mount the dispatch into a registry; dropping the guard unmounts it.
    pub fn mount<'r>(&self, registry: &'r DispatchRegistry) -> DispatchGuard<'r> {
        registry.mount(self.dispatch.clone())
    }
}

impl<X> Clone for FormHandle<X> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<X> std::fmt::Debug for FormHandle<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHandle").finish_non_exhaustive()
    }
}
