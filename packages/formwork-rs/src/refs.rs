//! Element-lifecycle observers and ordered ref merging.
//!
//! The rendering layer reports a field element's lifecycle by calling the
//! field's attach hook with `Some(handle)` on mount (and on updates) and
//! `None` on unmount. A field usually has two observers, the manager's
//! internal one and an optional external one; [`MergedRefs`] fans every
//! notification out to all of them, internal first.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use uuid::Uuid;

/// Opaque handle identifying a mounted field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(Uuid);

impl ElementHandle {
    /// Mint a handle for a newly mounted element.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An element-lifecycle observer.
///
/// Receives `Some(handle)` when the element mounts or updates and `None`
/// when it unmounts.
pub type FieldRef = Arc<dyn Fn(Option<&ElementHandle>) + Send + Sync>;

/// Ordered fan-out of element-lifecycle notifications.
///
/// Observers are notified in registration order on every attach, so each of
/// them sees the element's full lifecycle.
#[derive(Clone, Default)]
pub struct MergedRefs {
    observers: SmallVec<[FieldRef; 2]>,
}

impl MergedRefs {
    /// An empty observer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer set with one initial observer.
    pub fn single(observer: FieldRef) -> Self {
        let mut refs = Self::new();
        refs.push(observer);
        refs
    }

    /// Append an observer; it is notified after all existing ones.
    pub fn push(&mut self, observer: FieldRef) {
        self.observers.push(observer);
    }

    /// Notify every observer, in order.
    pub fn attach(&self, element: Option<&ElementHandle>) {
        for observer in &self.observers {
            observer(element);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for MergedRefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedRefs")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn observers_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut refs = MergedRefs::new();
        for name in ["internal", "external"] {
            let log = log.clone();
            refs.push(Arc::new(move |el: Option<&ElementHandle>| {
                log.lock()
                    .unwrap()
                    .push(format!("{name}:{}", el.is_some()));
            }));
        }

        let element = ElementHandle::new();
        refs.attach(Some(&element));
        refs.attach(None);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["internal:true", "external:true", "internal:false", "external:false"]
        );
    }

    #[test]
    fn single_starts_with_one_observer() {
        let refs = MergedRefs::single(Arc::new(|_el: Option<&ElementHandle>| {}));
        assert_eq!(refs.len(), 1);
        assert!(!refs.is_empty());
    }
}
