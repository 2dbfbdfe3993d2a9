use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::spec::field::{FieldGroup, FieldSpec};

/// Submit control shown at the end of every form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmitButton {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self {
            label: "Submit".into(),
            style: None,
        }
    }
}

/// Serialisable part of a form description: ordered groups, the submit
/// control and the form-level style fallbacks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_style: Option<String>,
    #[serde(default)]
    pub button: SubmitButton,
    pub elements: Vec<FieldGroup>,
}

impl FormSpec {
    pub fn new(elements: Vec<FieldGroup>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, FormError> {
        serde_json::from_str(raw).map_err(FormError::Parse)
    }

    /// Field descriptors in description order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.elements.iter().map(|group| &group.field)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.name == name)
    }

    /// Names that appear more than once. The engine keys values and errors by
    /// name, so duplicates collide; this only reports them.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for field in self.fields() {
            if !seen.insert(field.name.as_str()) {
                duplicates.insert(field.name.clone());
            }
        }
        duplicates.into_iter().collect()
    }
}
