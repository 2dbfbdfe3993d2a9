//! Declarative rule schema.
//!
//! The engine only depends on [`ValidationSchema`]; this is one
//! implementation of it that can be loaded from JSON next to a form
//! description.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::validate::{FieldErrors, FormData, ValidationSchema};

/// Constraints applied to a single field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Replaces the built-in message for every failure except "Required".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Object schema keyed by field name. Parsing keeps declared keys only.
///
/// Patterns are compiled on the first parse and reused afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RuleSchema {
    fields: BTreeMap<String, FieldRules>,
    #[serde(skip)]
    patterns: PatternCache,
}

impl RuleSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rules: FieldRules) -> Self {
        self.fields.insert(name.into(), rules);
        self.patterns = PatternCache::default();
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldRules> {
        &self.fields
    }

    fn compiled_patterns(&self) -> Result<&BTreeMap<String, Regex>, SchemaError> {
        self.patterns
            .0
            .get_or_init(|| compile_patterns(&self.fields))
            .as_ref()
            .map_err(|message| SchemaError::Failed(message.clone()))
    }
}

/// Compiled `pattern` rules keyed by field name. Derived from the rules, so it
/// never takes part in equality.
#[derive(Debug, Clone, Default)]
struct PatternCache(OnceLock<Result<BTreeMap<String, Regex>, String>>);

impl PartialEq for PatternCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

fn compile_patterns(
    fields: &BTreeMap<String, FieldRules>,
) -> Result<BTreeMap<String, Regex>, String> {
    fields
        .iter()
        .filter_map(|(name, rules)| rules.pattern.as_ref().map(|pattern| (name, pattern)))
        .map(|(name, pattern)| {
            Regex::new(pattern)
                .map(|regex| (name.clone(), regex))
                .map_err(|err| format!("invalid pattern '{pattern}' for '{name}': {err}"))
        })
        .collect()
}

impl ValidationSchema for RuleSchema {
    fn parse(&self, data: &FormData) -> Result<FormData, SchemaError> {
        let patterns = self.compiled_patterns()?;
        let mut parsed = FormData::new();
        let mut errors = FieldErrors::new();

        for (name, rules) in &self.fields {
            let value = data.get(name).filter(|value| !is_blank(value));
            match value {
                None if rules.required => {
                    errors.insert(name.clone(), "Required".into());
                }
                None => {
                    if let Some(value) = data.get(name) {
                        parsed.insert(name.clone(), value.clone());
                    }
                }
                Some(value) => match check(rules, patterns.get(name), value) {
                    Some(message) => {
                        errors.insert(name.clone(), message);
                    }
                    None => {
                        parsed.insert(name.clone(), value.clone());
                    }
                },
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(SchemaError::Invalid(errors))
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn check(rules: &FieldRules, pattern: Option<&Regex>, value: &Value) -> Option<String> {
    first_failure(rules, pattern, value)
        .map(|builtin| rules.message.clone().unwrap_or_else(|| builtin.to_string()))
}

fn first_failure(
    rules: &FieldRules,
    pattern: Option<&Regex>,
    value: &Value,
) -> Option<&'static str> {
    if rules.email
        && let Some(text) = value.as_str()
        && !email_regex().is_match(text)
    {
        return Some("Invalid email");
    }

    if let Some(regex) = pattern
        && let Some(text) = value.as_str()
        && !regex.is_match(text)
    {
        return Some("Value does not match pattern");
    }

    if let Some(min_len) = rules.min_len
        && let Some(text) = value.as_str()
        && text.chars().count() < min_len
    {
        return Some("Value is too short");
    }

    if let Some(max_len) = rules.max_len
        && let Some(text) = value.as_str()
        && text.chars().count() > max_len
    {
        return Some("Value is too long");
    }

    let number = as_number(value);

    if let Some(min) = rules.min
        && let Some(number) = number
        && number < min
    {
        return Some("Value is below minimum");
    }

    if let Some(max) = rules.max
        && let Some(number) = number
        && number > max
    {
        return Some("Value is above maximum");
    }

    None
}

/// Number inputs report strings, so numeric strings count as numbers.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"))
}
