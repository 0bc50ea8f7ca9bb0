//! Scoped registry binding mounted forms to their dispatch.
//!
//! The registry is the explicit replacement for an ambient provider slot:
//! each mounted form gets a [`FormId`], descendants resolve the dispatch by
//! that id, and unmounting tears the binding down. Resolving a form that was
//! never mounted is a configuration error and fails loudly; there is no
//! silent default, because an accessor-backed action executed against a
//! default would be meaningless.
//!
//! Dispatches are stored type-erased so one registry can host forms with
//! different extra-context types; the requested type is checked again on
//! resolve.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::dispatch::FormDispatch;
use crate::error::FormError;

/// Identity of a mounted form instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormId(Uuid);

impl FormId {
    /// Generate a fresh form identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of mounted form dispatches, keyed by [`FormId`].
///
/// # Example
///
/// ```ignore
/// let registry = DispatchRegistry::new();
///
/// // Provider side: mount on form setup, drop the guard on teardown.
/// let guard = registry.mount(dispatch);
/// let form = guard.form();
///
/// // Consumer side, anywhere below:
/// let dispatch = registry.resolve::<Services>(form);
/// ```
pub struct DispatchRegistry {
    forms: DashMap<FormId, Arc<dyn Any + Send + Sync>>,
}

impl DispatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            forms: DashMap::new(),
        }
    }

    /// Mount a dispatch under a fresh form id.
    ///
    /// The binding lives until the returned guard is dropped.
    pub fn mount<X: Send + Sync + 'static>(&self, dispatch: FormDispatch<X>) -> DispatchGuard<'_> {
        let form = FormId::new();
        self.forms.insert(form, Arc::new(dispatch));
        debug!(%form, "form dispatch mounted");
        DispatchGuard {
            registry: self,
            form,
        }
    }

    /// Resolve the dispatch mounted for `form`.
    ///
    /// # Panics
    ///
    /// Panics when nothing is mounted for `form`, or when the mounted
    /// dispatch has a different extra-context type. Both indicate missing
    /// provider wiring and should fail fast during development; use
    /// [`try_resolve`](Self::try_resolve) where a recoverable error is
    /// preferred.
    pub fn resolve<X: Send + Sync + 'static>(&self, form: FormId) -> FormDispatch<X> {
        self.try_resolve(form).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Resolve the dispatch mounted for `form`, returning a configuration
    /// error when absent or of the wrong extra-context type.
    pub fn try_resolve<X: Send + Sync + 'static>(
        &self,
        form: FormId,
    ) -> Result<FormDispatch<X>, FormError> {
        let entry = self
            .forms
            .get(&form)
            .ok_or(FormError::DispatchNotMounted { form })?;
        entry
            .value()
            .downcast_ref::<FormDispatch<X>>()
            .cloned()
            .ok_or(FormError::DispatchTypeMismatch {
                form,
                requested: std::any::type_name::<X>(),
            })
    }

    /// Whether a dispatch is currently mounted for `form`.
    pub fn is_mounted(&self, form: FormId) -> bool {
        self.forms.contains_key(&form)
    }

    /// Number of currently mounted forms.
    pub fn mounted_count(&self) -> usize {
        self.forms.len()
    }

    fn unmount(&self, form: FormId) {
        self.forms.remove(&form);
        debug!(%form, "form dispatch unmounted");
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRegistry")
            .field("mounted_count", &self.forms.len())
            .finish_non_exhaustive()
    }
}

/// RAII handle for a mounted dispatch; dropping it unmounts the form.
#[derive(Debug)]
pub struct DispatchGuard<'a> {
    registry: &'a DispatchRegistry,
    form: FormId,
}

impl DispatchGuard<'_> {
    /// The id the dispatch is mounted under.
    pub fn form(&self) -> FormId {
        self.form
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.registry.unmount(self.form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FormFixture;

    fn dispatch_with_extra<X: Send + Sync + 'static>(extra: X) -> FormDispatch<X> {
        FormDispatch::new(Arc::new(FormFixture::new()), extra)
    }

    #[test]
    fn mount_and_resolve_roundtrip() {
        let registry = DispatchRegistry::new();
        let guard = registry.mount(dispatch_with_extra("ctx".to_string()));

        let resolved = registry.resolve::<String>(guard.form());

        assert_eq!(resolved.extra(), "ctx");
        assert_eq!(registry.mounted_count(), 1);
    }

    #[test]
    fn resolving_an_unmounted_form_errors() {
        let registry = DispatchRegistry::new();

        let err = registry.try_resolve::<String>(FormId::new()).unwrap_err();

        assert!(matches!(err, FormError::DispatchNotMounted { .. }));
    }

    #[test]
    #[should_panic(expected = "no form dispatch is mounted")]
    fn resolve_panics_without_a_mount() {
        let registry = DispatchRegistry::new();
        registry.resolve::<String>(FormId::new());
    }

    #[test]
    fn resolving_with_the_wrong_extra_type_errors() {
        let registry = DispatchRegistry::new();
        let guard = registry.mount(dispatch_with_extra(7_u32));

        let err = registry.try_resolve::<String>(guard.form()).unwrap_err();

        assert!(matches!(err, FormError::DispatchTypeMismatch { .. }));
    }

    #[test]
    fn dropping_the_guard_unmounts() {
        let registry = DispatchRegistry::new();
        let guard = registry.mount(dispatch_with_extra(()));
        let form = guard.form();
        assert!(registry.is_mounted(form));

        drop(guard);

        assert!(!registry.is_mounted(form));
        assert!(matches!(
            registry.try_resolve::<()>(form),
            Err(FormError::DispatchNotMounted { .. })
        ));
    }

    #[test]
    fn forms_with_different_extra_types_coexist() {
        let registry = DispatchRegistry::new();
        let strings = registry.mount(dispatch_with_extra("a".to_string()));
        let numbers = registry.mount(dispatch_with_extra(1_u64));

        assert_eq!(registry.resolve::<String>(strings.form()).extra(), "a");
        assert_eq!(*registry.resolve::<u64>(numbers.form()).extra(), 1);
        assert_eq!(registry.mounted_count(), 2);
    }
}
