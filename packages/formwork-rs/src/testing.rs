//! Testing utilities: an in-memory form manager and gate instrumentation.
//!
//! Available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! formwork = { version = "0.1", features = ["testing"] }
//! ```
//!
//! [`FormFixture`] is a self-contained form-state manager implementing both
//! [`FormAccessor`] and [`FormControl`], so the dispatch layer and the
//! controlled-field layer can be exercised against the same state without a
//! UI. [`ManualGate`] holds every admission open until the test resolves it,
//! which makes the overlapping-resolution behavior reproducible.

use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::accessor::{FieldError, FieldState, FormAccessor, TriggerOptions};
use crate::compose::{FieldRegistration, FieldRules, FormControl};
use crate::controller::FieldController;
use crate::gate::ChangeGate;
use crate::refs::ElementHandle;

/// In-memory form-state manager for tests.
///
/// Field paths are flat keys. `required` and custom `validate` rules are
/// applied by [`trigger`](FormAccessor::trigger); numeric and pattern rules
/// are stored but not interpreted.
#[derive(Debug, Default)]
pub struct FormFixture {
    values: DashMap<String, Value>,
    defaults: DashMap<String, Value>,
    errors: DashMap<String, FieldError>,
    dirty: DashSet<String>,
    touched: DashSet<String>,
    rules: DashMap<String, FieldRules>,
    disabled: DashSet<String>,
    attached: DashMap<String, Option<ElementHandle>>,
    log: CallLog,
}

impl FormFixture {
    /// An empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fixture seeded from a JSON object; the entries become both the
    /// current values and the defaults.
    pub fn with_values(values: Value) -> Self {
        let fixture = Self::new();
        if let Value::Object(entries) = values {
            for (path, value) in entries {
                fixture.values.insert(path.clone(), value.clone());
                fixture.defaults.insert(path, value);
            }
        }
        fixture
    }

    /// A field's current value.
    pub fn value(&self, path: &str) -> Option<Value> {
        self.values.get(path).map(|entry| entry.value().clone())
    }

    /// A field's current error.
    pub fn error(&self, path: &str) -> Option<FieldError> {
        self.errors.get(path).map(|entry| entry.value().clone())
    }

    /// The rules a field was registered with.
    pub fn rules(&self, path: &str) -> Option<FieldRules> {
        self.rules.get(path).map(|entry| entry.value().clone())
    }

    /// Whether a field was registered as disabled.
    pub fn is_disabled(&self, path: &str) -> bool {
        self.disabled.contains(path)
    }

    /// Whether a field has been changed since its default.
    pub fn is_dirty(&self, path: &str) -> bool {
        self.dirty.contains(path)
    }

    /// Whether a field has received a blur.
    pub fn is_touched(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    /// The element last attached for a field, if any is mounted.
    pub fn last_attached(&self, path: &str) -> Option<ElementHandle> {
        self.attached.get(path).and_then(|entry| *entry)
    }

    /// The ordered record of accessor and controller calls.
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn validate_field(&self, path: &str) -> bool {
        let Some(rules) = self.rules.get(path).map(|entry| entry.value().clone()) else {
            return true;
        };
        let value = self
            .values
            .get(path)
            .map(|entry| entry.value().clone())
            .unwrap_or(Value::Null);

        if let Some(message) = &rules.required {
            if value_is_empty(&value) {
                self.errors.insert(
                    path.to_string(),
                    FieldError::with_message("required", message.clone()),
                );
                return false;
            }
        }
        if let Some(validators) = &rules.validate {
            for (name, validator) in validators {
                if let Some(message) = validator(&value) {
                    self.errors.insert(
                        path.to_string(),
                        FieldError::with_message(format!("validate:{name}"), message),
                    );
                    return false;
                }
            }
        }
        self.errors.remove(path);
        true
    }
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl FormAccessor for FormFixture {
    fn get_values(&self, path: Option<&str>) -> Value {
        match path {
            Some(path) => self
                .values
                .get(path)
                .map(|entry| entry.value().clone())
                .unwrap_or(Value::Null),
            None => {
                let mut record = serde_json::Map::new();
                for entry in self.values.iter() {
                    record.insert(entry.key().clone(), entry.value().clone());
                }
                Value::Object(record)
            }
        }
    }

    fn set_value(&self, path: &str, value: Value) {
        self.log.record(format!("set_value:{path}"));
        self.values.insert(path.to_string(), value);
        self.dirty.insert(path.to_string());
    }

    fn set_error(&self, path: &str, error: FieldError) {
        self.log.record(format!("set_error:{path}"));
        self.errors.insert(path.to_string(), error);
    }

    fn clear_errors(&self, path: Option<&str>) {
        self.log.record(match path {
            Some(path) => format!("clear_errors:{path}"),
            None => "clear_errors".to_string(),
        });
        match path {
            Some(path) => {
                self.errors.remove(path);
            }
            None => self.errors.clear(),
        }
    }

    async fn trigger(&self, path: Option<&str>, _options: TriggerOptions) -> bool {
        self.log.record(match path {
            Some(path) => format!("trigger:{path}"),
            None => "trigger".to_string(),
        });
        match path {
            Some(path) => self.validate_field(path),
            None => {
                let paths: Vec<String> =
                    self.rules.iter().map(|entry| entry.key().clone()).collect();
                let mut valid = true;
                for path in paths {
                    valid &= self.validate_field(&path);
                }
                valid
            }
        }
    }

    fn reset(&self, values: Option<Value>) {
        self.log.record("reset".to_string());
        if let Some(Value::Object(entries)) = values {
            self.defaults.clear();
            for (path, value) in entries {
                self.defaults.insert(path, value);
            }
        }
        self.values.clear();
        for entry in self.defaults.iter() {
            self.values.insert(entry.key().clone(), entry.value().clone());
        }
        self.errors.clear();
        self.dirty.clear();
        self.touched.clear();
    }

    fn reset_field(&self, path: &str) {
        self.log.record(format!("reset_field:{path}"));
        match self.defaults.get(path) {
            Some(default) => {
                self.values.insert(path.to_string(), default.clone());
            }
            None => {
                self.values.remove(path);
            }
        }
        self.errors.remove(path);
        self.dirty.remove(path);
        self.touched.remove(path);
    }

    fn get_field_state(&self, path: &str) -> FieldState {
        let error = self.error(path);
        FieldState {
            is_dirty: self.is_dirty(path),
            is_touched: self.is_touched(path),
            invalid: error.is_some(),
            error,
        }
    }
}

impl FormControl<Value> for Arc<FormFixture> {
    fn register(&self, registration: FieldRegistration<Value>) -> Arc<dyn FieldController<Value>> {
        let path = registration.path;
        self.log.record(format!("register:{path}"));

        let initial = registration
            .default_value
            .or_else(|| registration.rules.value.clone());
        if let Some(initial) = initial {
            self.defaults.insert(path.clone(), initial.clone());
            self.values.entry(path.clone()).or_insert(initial);
        }
        if registration.disabled {
            self.disabled.insert(path.clone());
        }
        self.rules.insert(path.clone(), registration.rules);

        Arc::new(FixtureController {
            form: self.clone(),
            path,
        })
    }
}

/// Per-field controller backed by a [`FormFixture`].
struct FixtureController {
    form: Arc<FormFixture>,
    path: String,
}

impl FieldController<Value> for FixtureController {
    fn value(&self) -> Value {
        self.form
            .values
            .get(&self.path)
            .map(|entry| entry.value().clone())
            .unwrap_or(Value::Null)
    }

    fn on_change(&self, value: Value) {
        self.form.log.record(format!("field_change:{}", self.path));
        self.form.values.insert(self.path.clone(), value);
        self.form.dirty.insert(self.path.clone());
    }

    fn on_blur(&self) {
        self.form.log.record(format!("field_blur:{}", self.path));
        self.form.touched.insert(self.path.clone());
    }

    fn attach(&self, element: Option<&ElementHandle>) {
        self.form
            .log
            .record(format!("field_attach:{}:{}", self.path, element.is_some()));
        self.form.attached.insert(self.path.clone(), element.copied());
    }

    fn field_state(&self) -> FieldState {
        self.form.get_field_state(&self.path)
    }
}

/// A gate whose admissions resolve only when the test says so.
///
/// Each `admit` call takes the next slot index (0-based, in call order) and
/// parks until [`resolve`](Self::resolve) is called for that index, in any
/// order. This makes the out-of-order resolution behavior of overlapping
/// changes reproducible.
#[derive(Debug, Default)]
pub struct ManualGate {
    slots: Mutex<Vec<Option<oneshot::Sender<bool>>>>,
}

impl ManualGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of admissions seen so far.
    pub fn calls(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// Number of admissions still waiting for a resolution.
    pub fn pending(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Resolve the admission at `index` (call order).
    ///
    /// # Panics
    ///
    /// Panics when the admission does not exist or was already resolved.
    pub fn resolve(&self, index: usize, admitted: bool) {
        let sender = self
            .slots
            .lock()
            .unwrap()
            .get_mut(index)
            .unwrap_or_else(|| panic!("no admission at index {index}"))
            .take()
            .unwrap_or_else(|| panic!("admission {index} already resolved"));
        let _ = sender.send(admitted);
    }

    /// Wait until at least `calls` admissions have been seen.
    pub async fn wait_for(&self, calls: usize) {
        while self.calls() < calls {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> ChangeGate<V> for ManualGate {
    async fn admit(&self, _proposed: &V, _current: &V) -> bool {
        let receiver = {
            let (sender, receiver) = oneshot::channel();
            self.slots.lock().unwrap().push(Some(sender));
            receiver
        };
        receiver.await.unwrap_or(false)
    }
}

/// Ordered call recorder shared between a fixture and its assertions.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Snapshot of all entries, in call order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Whether any entry equals `entry`.
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }
}
