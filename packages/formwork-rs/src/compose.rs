//! Field composition: rule merging plus controlled-field construction.
//!
//! [`FieldComposer`] is the explicit composition layer a feature module
//! binds once with its default validation rules. Per use it merges the
//! caller's override rules (override wins per key), registers the field
//! with the form-state manager through [`FormControl`], and wraps the
//! resulting controller into a [`ControlledField`]. With
//! [`render`](FieldComposer::render) the composed field and any passthrough
//! props go straight into a render function.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::controller::{ControlledField, FieldController};
use crate::gate::ChangeGate;
use crate::refs::FieldRef;

/// A named custom validator: `None` is a pass, `Some(message)` a failure.
pub type Validator = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Custom validators keyed by name.
pub type Validators = HashMap<String, Validator>;

/// Validation rules and registration options for one field.
///
/// Two rule sets merge key-wise with [`merge`](Self::merge); a key set on
/// the override side entirely replaces the default for that key. The
/// `validate` map counts as a single key and is replaced wholesale, never
/// merged entry by entry.
#[derive(Clone, Default)]
pub struct FieldRules {
    /// The field must be non-empty; the message to attach when it is not.
    pub required: Option<String>,
    /// Minimum numeric value.
    pub min: Option<f64>,
    /// Maximum numeric value.
    pub max: Option<f64>,
    /// Minimum string length.
    pub min_length: Option<usize>,
    /// Maximum string length.
    pub max_length: Option<usize>,
    /// Regular-expression pattern the value must match.
    pub pattern: Option<String>,
    /// Named custom validators.
    pub validate: Option<Validators>,
    /// Initial value supplied through the rules.
    pub value: Option<Value>,
}

impl FieldRules {
    /// Shallow key-wise merge; `overrides` wins on every key it sets.
    pub fn merge(defaults: &FieldRules, overrides: &FieldRules) -> FieldRules {
        FieldRules {
            required: overrides
                .required
                .clone()
                .or_else(|| defaults.required.clone()),
            min: overrides.min.or(defaults.min),
            max: overrides.max.or(defaults.max),
            min_length: overrides.min_length.or(defaults.min_length),
            max_length: overrides.max_length.or(defaults.max_length),
            pattern: overrides
                .pattern
                .clone()
                .or_else(|| defaults.pattern.clone()),
            validate: overrides
                .validate
                .clone()
                .or_else(|| defaults.validate.clone()),
            value: overrides.value.clone().or_else(|| defaults.value.clone()),
        }
    }

    /// Rules with only `required` set.
    pub fn required(message: impl Into<String>) -> Self {
        Self {
            required: Some(message.into()),
            ..Self::default()
        }
    }

    /// Set the minimum numeric value.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the maximum numeric value.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Add a named custom validator.
    pub fn with_validator<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validate
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), Arc::new(validator));
        self
    }
}

impl fmt::Debug for FieldRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let validators: Option<Vec<&String>> =
            self.validate.as_ref().map(|v| v.keys().collect());
        f.debug_struct("FieldRules")
            .field("required", &self.required)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern)
            .field("validate", &validators)
            .field("value", &self.value)
            .finish()
    }
}

/// What the manager needs to register one field.
#[derive(Debug)]
pub struct FieldRegistration<V> {
    pub path: String,
    pub rules: FieldRules,
    pub default_value: Option<V>,
    pub disabled: bool,
}

/// Field-registration boundary on the external form-state manager.
pub trait FormControl<V> {
    /// Register a field and return its controller.
    fn register(&self, registration: FieldRegistration<V>) -> Arc<dyn FieldController<V>>;
}

/// Per-use options for composing one controlled field.
pub struct ComposeOptions<V> {
    pub path: String,
    pub default_value: Option<V>,
    pub rules: Option<FieldRules>,
    pub on_change: Option<Arc<dyn Fn(&V) + Send + Sync>>,
    pub gate: Option<Arc<dyn ChangeGate<V>>>,
    pub field_ref: Option<FieldRef>,
    pub disabled: bool,
}

impl<V> ComposeOptions<V> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_value: None,
            rules: None,
            on_change: None,
            gate: None,
            field_ref: None,
            disabled: false,
        }
    }

    /// Initial value for the field.
    pub fn with_default_value(mut self, value: V) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Override rules, merged over the composer's defaults.
    pub fn with_rules(mut self, rules: FieldRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// External change callback, invoked for every admitted value.
    pub fn with_on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Admission gate for proposed values.
    pub fn with_gate(mut self, gate: Arc<dyn ChangeGate<V>>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// External element-lifecycle observer.
    pub fn with_field_ref(mut self, field_ref: FieldRef) -> Self {
        self.field_ref = Some(field_ref);
        self
    }

    /// Register the field as disabled.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl<V> fmt::Debug for ComposeOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeOptions")
            .field("path", &self.path)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// Composes controlled fields over fixed default rules.
///
/// # Example
///
/// ```ignore
/// let composer = FieldComposer::new(FieldRules::required("name is required"));
///
/// composer.render(
///     &control,
///     ComposeOptions::new("name").with_rules(FieldRules::default().with_max(64.0)),
///     label,
///     |field, label| text_input(label, field),
/// );
/// ```
pub struct FieldComposer<V> {
    defaults: FieldRules,
    _value: PhantomData<fn() -> V>,
}

impl<V> FieldComposer<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Bind the composer's default rules.
    pub fn new(defaults: FieldRules) -> Self {
        Self {
            defaults,
            _value: PhantomData,
        }
    }

    /// The binding-time default rules.
    pub fn defaults(&self) -> &FieldRules {
        &self.defaults
    }

    /// Register the field with the manager and wrap its controller.
    ///
    /// Effective rules are recomputed from this call's overrides; the
    /// defaults stay fixed for the composer's lifetime.
    pub fn compose(
        &self,
        control: &dyn FormControl<V>,
        options: ComposeOptions<V>,
    ) -> ControlledField<V> {
        let rules = match &options.rules {
            Some(overrides) => FieldRules::merge(&self.defaults, overrides),
            None => self.defaults.clone(),
        };
        let controller = control.register(FieldRegistration {
            path: options.path,
            rules,
            default_value: options.default_value,
            disabled: options.disabled,
        });

        let mut field = ControlledField::new(controller);
        if let Some(callback) = options.on_change {
            field = field.with_on_change(move |value: &V| callback(value));
        }
        if let Some(gate) = options.gate {
            field = field.with_gate(gate);
        }
        if let Some(field_ref) = options.field_ref {
            field = field.with_ref(field_ref);
        }
        field
    }

    /// Compose the field and hand it, with any passthrough props, to a
    /// render function.
    pub fn render<P, T, F>(
        &self,
        control: &dyn FormControl<V>,
        options: ComposeOptions<V>,
        props: P,
        render: F,
    ) -> T
    where
        F: FnOnce(ControlledField<V>, P) -> T,
    {
        render(self.compose(control, options), props)
    }
}

impl<V> Default for FieldComposer<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(FieldRules::default())
    }
}

impl<V> fmt::Debug for FieldComposer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldComposer")
            .field("defaults", &self.defaults)
            .finish()
    }
}
