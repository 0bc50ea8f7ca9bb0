//! Controlled fields: a per-field controller wrapped with an admission gate.
//!
//! The external manager supplies a [`FieldController`] per field. A
//! [`ControlledField`] wraps it with an optional external change callback,
//! an optional [`ChangeGate`], and external ref merging, and is what a UI
//! element binds to for two-way value synchronization.
//!
//! # Change algorithm
//!
//! For `on_change(proposed)`:
//!
//! 1. Without a gate the change applies synchronously: the controller's
//!    internal update runs first, the external callback second, so the
//!    callback always observes consistent internal state if it re-reads the
//!    field.
//! 2. With a gate, the current value is captured at call time and the
//!    evaluation runs as a spawned task. An admitted proposal then applies
//!    the same internal-then-external sequence against whatever the state is
//!    at resolution time; a rejected one does nothing.
//!
//! # Overlapping admissions
//!
//! Each `on_change` call captures its own current value and resolves
//! independently. Nothing serializes or cancels in-flight evaluations:
//! overlapping calls may resolve out of order, and whichever resolves last
//! wins. Callers that need strict ordering must serialize their own calls,
//! for example by awaiting each [`ChangeTicket`] before proposing again.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::accessor::FieldState;
use crate::gate::ChangeGate;
use crate::refs::{ElementHandle, FieldRef, MergedRefs};

/// Per-field controller supplied by the external form-state manager.
///
/// Methods take `&self`; implementations use interior mutability and must
/// stay callable after the UI element is gone, since a pending admission may
/// resolve late. Applying a late change must not panic.
pub trait FieldController<V>: Send + Sync + 'static {
    /// The field's current recorded value.
    fn value(&self) -> V;

    /// Record a new value.
    fn on_change(&self, value: V);

    /// Record a blur event.
    fn on_blur(&self);

    /// Observe the field element's lifecycle.
    fn attach(&self, element: Option<&ElementHandle>);

    /// The field's validation state.
    fn field_state(&self) -> FieldState;
}

/// A controller wrapped with gating, an external callback, and merged refs.
///
/// Cheap to clone; clones share the controller, so any of them can propose
/// changes. [`value`](Self::value) reads through to the controller and
/// therefore mirrors the last *admitted* value, not the last attempted one.
///
/// # Example
///
/// ```ignore
/// let field = ControlledField::new(controller)
///     .with_gate(gate_fn(|proposed: &String, _| !proposed.is_empty()))
///     .with_on_change(|value| println!("admitted {value}"));
///
/// field.on_change("hello".into());
/// ```
pub struct ControlledField<V> {
    controller: Arc<dyn FieldController<V>>,
    external_on_change: Option<Arc<dyn Fn(&V) + Send + Sync>>,
    gate: Option<Arc<dyn ChangeGate<V>>>,
    refs: MergedRefs,
}

impl<V> ControlledField<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Wrap a controller. The controller's own lifecycle observer is always
    /// the first merged ref.
    pub fn new(controller: Arc<dyn FieldController<V>>) -> Self {
        let internal = {
            let controller = controller.clone();
            Arc::new(move |element: Option<&ElementHandle>| controller.attach(element)) as FieldRef
        };
        Self {
            controller,
            external_on_change: None,
            gate: None,
            refs: MergedRefs::single(internal),
        }
    }

    /// Install the external change callback, invoked after the internal
    /// update for every admitted value.
    pub fn with_on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        self.external_on_change = Some(Arc::new(callback));
        self
    }

    /// Install the admission gate.
    pub fn with_gate(mut self, gate: Arc<dyn ChangeGate<V>>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Merge an external lifecycle observer; it is notified after the
    /// controller's internal one.
    pub fn with_ref(mut self, external: FieldRef) -> Self {
        self.refs.push(external);
        self
    }

    /// Propose a new value.
    ///
    /// Without a gate the change applies before this method returns and the
    /// ticket is already settled. With a gate the evaluation runs as a
    /// spawned task; the ticket can be awaited for the admission outcome or
    /// dropped to leave the evaluation running detached. There is no
    /// cancellation.
    ///
    /// A panicking gate is reported via `tracing` and treated as rejection.
    pub fn on_change(&self, proposed: V) -> ChangeTicket {
        let Some(gate) = self.gate.clone() else {
            self.apply(proposed);
            return ChangeTicket::settled(true);
        };

        // Captured now, by the call; resolution applies against whatever the
        // controller holds by then.
        let current = self.controller.value();
        let field = self.clone();
        let handle = tokio::spawn(async move {
            let admitted = AssertUnwindSafe(gate.admit(&proposed, &current))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    error!(panic = %panic_message(&panic), "change gate panicked");
                    false
                });
            if admitted {
                field.apply(proposed);
            } else {
                debug!("proposed value rejected by change gate");
            }
            admitted
        });
        ChangeTicket::pending(handle)
    }

    /// Forward a blur event to the controller.
    pub fn on_blur(&self) {
        self.controller.on_blur();
    }

    /// Notify all merged refs of an element lifecycle change.
    pub fn attach(&self, element: Option<&ElementHandle>) {
        self.refs.attach(element);
    }

    /// The last admitted value.
    pub fn value(&self) -> V {
        self.controller.value()
    }

    /// The field's validation state.
    pub fn field_state(&self) -> FieldState {
        self.controller.field_state()
    }

    fn apply(&self, value: V) {
        self.controller.on_change(value.clone());
        if let Some(callback) = &self.external_on_change {
            callback(&value);
        }
    }
}

impl<V> Clone for ControlledField<V> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            external_on_change: self.external_on_change.clone(),
            gate: self.gate.clone(),
            refs: self.refs.clone(),
        }
    }
}

impl<V> std::fmt::Debug for ControlledField<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlledField")
            .field("gated", &self.gate.is_some())
            .field("refs", &self.refs)
            .finish_non_exhaustive()
    }
}

/// Outcome handle for one proposed change.
///
/// Settled immediately for ungated changes; for gated ones it wraps the
/// spawned evaluation. Dropping a pending ticket detaches the evaluation
/// rather than cancelling it.
#[derive(Debug)]
pub struct ChangeTicket {
    state: TicketState,
}

#[derive(Debug)]
enum TicketState {
    Settled(bool),
    Pending(JoinHandle<bool>),
}

impl ChangeTicket {
    fn settled(admitted: bool) -> Self {
        Self {
            state: TicketState::Settled(admitted),
        }
    }

    fn pending(handle: JoinHandle<bool>) -> Self {
        Self {
            state: TicketState::Pending(handle),
        }
    }

    /// Whether the outcome is still being evaluated.
    pub fn is_pending(&self) -> bool {
        match &self.state {
            TicketState::Settled(_) => false,
            TicketState::Pending(handle) => !handle.is_finished(),
        }
    }

    /// Wait for the admission outcome.
    pub async fn admitted(self) -> bool {
        match self.state {
            TicketState::Settled(admitted) => admitted,
            // The evaluation task never panics (gate panics are caught and
            // logged) and is never aborted, so a join error is unreachable
            // in practice; treat it as rejection.
            TicketState::Pending(handle) => handle.await.unwrap_or(false),
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::gate_fn;
    use crate::testing::ManualGate;
    use std::sync::Mutex;

    struct ProbeController {
        value: Mutex<String>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ProbeController {
        fn new(initial: &str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(initial.to_string()),
                log,
            })
        }
    }

    impl FieldController<String> for ProbeController {
        fn value(&self) -> String {
            self.value.lock().unwrap().clone()
        }

        fn on_change(&self, value: String) {
            self.log.lock().unwrap().push(format!("internal:{value}"));
            *self.value.lock().unwrap() = value;
        }

        fn on_blur(&self) {
            self.log.lock().unwrap().push("blur".to_string());
        }

        fn attach(&self, element: Option<&ElementHandle>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("attach:{}", element.is_some()));
        }

        fn field_state(&self) -> FieldState {
            FieldState::default()
        }
    }

    fn probe_field(initial: &str) -> (Arc<Mutex<Vec<String>>>, ControlledField<String>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let controller = ProbeController::new(initial, log.clone());
        let external = log.clone();
        let field = ControlledField::new(controller).with_on_change(move |value: &String| {
            external.lock().unwrap().push(format!("external:{value}"));
        });
        (log, field)
    }

    #[tokio::test]
    async fn ungated_change_applies_internal_then_external() {
        let (log, field) = probe_field("");

        let ticket = field.on_change("newValue".to_string());

        assert!(!ticket.is_pending());
        assert!(ticket.admitted().await);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["internal:newValue", "external:newValue"]
        );
        assert_eq!(field.value(), "newValue");
    }

    #[tokio::test]
    async fn gate_admits_matching_value_only() {
        let (log, field) = probe_field("");
        let field = field.with_gate(gate_fn(|proposed: &String, _: &String| proposed == "t"));

        assert!(!field.on_change("3".to_string()).admitted().await);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(field.value(), "");

        assert!(field.on_change("t".to_string()).admitted().await);
        assert_eq!(*log.lock().unwrap(), vec!["internal:t", "external:t"]);
        assert_eq!(field.value(), "t");
    }

    #[tokio::test]
    async fn gate_observes_the_value_at_call_time() {
        let (log, field) = probe_field("test1");
        let field = field.with_gate(gate_fn(|_: &String, prev: &String| prev != "test1"));

        assert!(!field.on_change("111".to_string()).admitted().await);
        assert!(!field.on_change("anotherValue".to_string()).admitted().await);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(field.value(), "test1");
    }

    #[tokio::test]
    async fn same_gate_admits_when_the_default_differs() {
        let (log, field) = probe_field("");
        let field = field.with_gate(gate_fn(|_: &String, prev: &String| prev != "test1"));

        assert!(field.on_change("111".to_string()).admitted().await);
        assert_eq!(*log.lock().unwrap(), vec!["internal:111", "external:111"]);
    }

    #[tokio::test]
    async fn overlapping_admissions_last_resolved_wins() {
        let (log, field) = probe_field("");
        let gate = ManualGate::new();
        let field = field.with_gate(gate.clone() as Arc<dyn ChangeGate<String>>);

        let first = field.on_change("first".to_string());
        gate.wait_for(1).await;
        let second = field.on_change("second".to_string());
        gate.wait_for(2).await;

        gate.resolve(1, true);
        assert!(second.admitted().await);
        assert_eq!(field.value(), "second");

        gate.resolve(0, true);
        assert!(first.admitted().await);
        assert_eq!(field.value(), "first");

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "internal:second",
                "external:second",
                "internal:first",
                "external:first"
            ]
        );
    }

    #[tokio::test]
    async fn shuffled_resolutions_apply_the_last_resolved() {
        let (_log, field) = probe_field("");
        let gate = ManualGate::new();
        let field = field.with_gate(gate.clone() as Arc<dyn ChangeGate<String>>);

        let count = 6;
        let mut tickets = Vec::with_capacity(count);
        for i in 0..count {
            tickets.push(field.on_change(format!("v{i}")));
            // Serialize slot registration so slot i belongs to proposal i;
            // the evaluations themselves all stay pending concurrently.
            gate.wait_for(i + 1).await;
        }

        fastrand::seed(7);
        let mut order: Vec<usize> = (0..count).collect();
        fastrand::shuffle(&mut order);
        for index in &order {
            gate.resolve(*index, true);
        }
        for ticket in tickets {
            assert!(ticket.admitted().await);
        }

        let last = order.last().copied().unwrap();
        assert_eq!(field.value(), format!("v{last}"));
    }

    #[tokio::test]
    async fn late_resolution_after_the_field_is_dropped_still_applies() {
        let (log, field) = probe_field("");
        let gate = ManualGate::new();
        let gated = field.clone().with_gate(gate.clone() as Arc<dyn ChangeGate<String>>);

        let ticket = gated.on_change("late".to_string());
        gate.wait_for(1).await;
        drop(gated);

        gate.resolve(0, true);
        assert!(ticket.admitted().await);
        assert_eq!(*log.lock().unwrap(), vec!["internal:late", "external:late"]);
        assert_eq!(field.value(), "late");
    }

    #[tokio::test]
    async fn panicking_gate_is_treated_as_rejection() {
        let (log, field) = probe_field("steady");
        let field = field.with_gate(gate_fn(|_: &String, _: &String| -> bool {
            panic!("gate blew up")
        }));

        assert!(!field.on_change("x".to_string()).admitted().await);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(field.value(), "steady");
    }

    #[tokio::test]
    async fn refs_notify_internal_then_external() {
        let (log, field) = probe_field("");
        let external = log.clone();
        let field = field.with_ref(Arc::new(move |element: Option<&ElementHandle>| {
            external
                .lock()
                .unwrap()
                .push(format!("external-ref:{}", element.is_some()));
        }));

        let element = ElementHandle::new();
        field.attach(Some(&element));
        field.attach(None);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "attach:true",
                "external-ref:true",
                "attach:false",
                "external-ref:false"
            ]
        );
    }

    #[tokio::test]
    async fn blur_forwards_to_the_controller() {
        let (log, field) = probe_field("");
        field.on_blur();
        assert_eq!(*log.lock().unwrap(), vec!["blur"]);
    }
}
