use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of input kinds a form can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Number,
    /// Descriptive only: no control is rendered or registered for it.
    Relation,
    #[serde(alias = "datetime-local")]
    Datetime,
    Date,
    Checkbox,
}

impl FieldKind {
    /// Value of the `type` attribute on the rendered control.
    pub fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Number => "number",
            FieldKind::Relation => "relation",
            FieldKind::Datetime => "datetime-local",
            FieldKind::Date => "date",
            FieldKind::Checkbox => "checkbox",
        }
    }

    /// Whether the render engine produces a bound control for this kind.
    pub fn has_control(&self) -> bool {
        !matches!(self, FieldKind::Relation)
    }

    /// Value a freshly registered control holds before any input.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Checkbox => Value::Bool(false),
            _ => Value::String(String::new()),
        }
    }
}

/// Optional label rendered above a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Label {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Input-level descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Scalar or nested mapping merged into the submitted payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_style: Option<String>,
}

fn default_visible() -> bool {
    true
}

impl FieldSpec {
    pub fn new(kind: FieldKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            visible: true,
            default: None,
            placeholder: None,
            style: None,
            error_style: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_error_style(mut self, style: impl Into<String>) -> Self {
        self.error_style = Some(style.into());
        self
    }
}

/// One label + input pairing within a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldGroup {
    /// Container style; falls back to the form-level element style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub field: FieldSpec,
}

impl FieldGroup {
    pub fn new(field: FieldSpec) -> Self {
        Self {
            style: None,
            label: None,
            field,
        }
    }

    pub fn labelled(mut self, text: impl Into<String>) -> Self {
        self.label = Some(Label {
            text: text.into(),
            style: None,
        });
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}
