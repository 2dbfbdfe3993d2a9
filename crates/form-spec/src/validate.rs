use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{FormError, SchemaError};
use crate::spec::field::FieldKind;

/// Field values keyed by field name.
pub type FormData = Map<String, Value>;

/// Human-readable messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Externally supplied validation capability.
///
/// A schema receives the collected form data and either returns the parsed
/// data (it may coerce or strip keys) or rejects it. Keys of
/// [`SchemaError::Invalid`] are matched against field names verbatim.
pub trait ValidationSchema: Send + Sync {
    fn parse(&self, data: &FormData) -> Result<FormData, SchemaError>;
}

impl<F> ValidationSchema for F
where
    F: Fn(&FormData) -> Result<FormData, SchemaError> + Send + Sync,
{
    fn parse(&self, data: &FormData) -> Result<FormData, SchemaError> {
        self(data)
    }
}

/// Narrow `validate(data)` contract the engine depends on, whatever schema
/// sits behind it.
#[derive(Clone)]
pub struct Validator {
    schema: Arc<dyn ValidationSchema>,
}

impl Validator {
    pub fn new(schema: Arc<dyn ValidationSchema>) -> Self {
        Self { schema }
    }

    pub fn validate(&self, data: &FormData) -> Result<FormData, SchemaError> {
        self.schema.parse(data)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

pub fn make_validator<S>(schema: S) -> Validator
where
    S: ValidationSchema + 'static,
{
    Validator::new(Arc::new(schema))
}

/// Accepts any data unchanged.
pub fn accept_all(data: &FormData) -> Result<FormData, SchemaError> {
    Ok(data.clone())
}

/// Current values of every mounted control, keyed by field name in
/// registration order.
///
/// Controls register themselves when rendered, hidden ones included, so a
/// hidden field still takes part in validation and submission.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    values: FormData,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a control. Re-registering keeps the current value.
    pub fn register(&mut self, name: &str, kind: FieldKind) {
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), kind.empty_value());
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FormError::UnknownField(name.to_string())),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Snapshot of the data a submit would collect.
    pub fn values(&self) -> FormData {
        self.values.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reject_short_names(data: &FormData) -> Result<FormData, SchemaError> {
        match data.get("name").and_then(Value::as_str) {
            Some(name) if name.len() >= 3 => Ok(data.clone()),
            _ => Err(SchemaError::Invalid(FieldErrors::from([(
                "name".to_string(),
                "Too short".to_string(),
            )]))),
        }
    }

    #[test]
    fn validator_delegates_to_function_schema() {
        let validator = make_validator(reject_short_names);

        let mut data = FormData::new();
        data.insert("name".into(), json!("al"));
        let err = validator.validate(&data).expect_err("too short");
        assert_eq!(
            err,
            SchemaError::Invalid(FieldErrors::from([("name".into(), "Too short".into())]))
        );

        data.insert("name".into(), json!("alice"));
        assert_eq!(validator.validate(&data).expect("valid"), data);
    }

    #[test]
    fn registry_seeds_empty_values_per_kind() {
        let mut registry = FieldRegistry::new();
        registry.register("email", FieldKind::Email);
        registry.register("active", FieldKind::Checkbox);

        let values = registry.values();
        assert_eq!(values["email"], json!(""));
        assert_eq!(values["active"], json!(false));
    }

    #[test]
    fn registry_keeps_values_across_registration() {
        let mut registry = FieldRegistry::new();
        registry.register("email", FieldKind::Email);
        registry
            .set_value("email", json!("a@b.com"))
            .expect("registered");
        registry.register("email", FieldKind::Email);
        assert_eq!(registry.value("email"), Some(&json!("a@b.com")));
    }

    #[test]
    fn registry_values_follow_registration_order() {
        let mut registry = FieldRegistry::new();
        registry.register("zeta", FieldKind::Text);
        registry.register("alpha", FieldKind::Checkbox);
        registry.register("zeta", FieldKind::Text);

        let values = registry.values();
        let names: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn registry_rejects_unknown_fields() {
        let mut registry = FieldRegistry::new();
        let err = registry.set_value("ghost", json!(1)).expect_err("unknown");
        assert!(matches!(err, FormError::UnknownField(name) if name == "ghost"));
    }
}
