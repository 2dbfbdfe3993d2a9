use serde_json::{Map, Value};

use crate::spec::field::FieldSpec;

/// Field name to pre-filled value.
pub type DefaultValueMap = Map<String, Value>;

/// Collects every non-empty default in field order. A later field with the
/// same name overwrites an earlier one.
pub fn resolve_defaults<'a, I>(fields: I) -> DefaultValueMap
where
    I: IntoIterator<Item = &'a FieldSpec>,
{
    let mut defaults = DefaultValueMap::new();
    for field in fields {
        if let Some(value) = &field.default
            && !is_empty(value)
        {
            defaults.insert(field.name.clone(), value.clone());
        }
    }
    defaults
}

/// A default only counts when it is truthy: null, `false`, zero and the empty
/// string are skipped, while objects and arrays are kept even when empty.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(num) => num.as_f64().is_none_or(|n| n == 0.0 || n.is_nan()),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
