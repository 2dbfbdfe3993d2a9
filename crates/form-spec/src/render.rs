use serde_json::{Map, Value, json};

use crate::spec::field::{FieldGroup, FieldKind};
use crate::spec::form::FormSpec;
use crate::submit::SubmissionState;
use crate::validate::FieldRegistry;

/// Label attached to a control.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLabel {
    pub text: String,
    pub html_for: String,
    pub style: Option<String>,
}

/// Input control bound to the field registry under `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedInput {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    pub style: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<Value>,
}

/// Inline error shown under a control.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedError {
    pub message: String,
    pub style: Option<String>,
}

/// One mounted field group. Hidden groups stay in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    pub style: Option<String>,
    pub hidden: bool,
    pub label: Option<RenderedLabel>,
    pub input: RenderedInput,
    pub error: Option<RenderedError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedButton {
    pub label: String,
    pub style: Option<String>,
    pub disabled: bool,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub style: Option<String>,
    pub fields: Vec<RenderedField>,
    pub submit: RenderedButton,
}

impl RenderTree {
    pub fn field(&self, name: &str) -> Option<&RenderedField> {
        self.fields.iter().find(|field| field.input.name == name)
    }

    /// Control names in rendering order.
    pub fn names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|field| field.input.name.as_str())
            .collect()
    }
}

/// Maps the description to bound controls, registering each mounted control.
///
/// Relation fields produce nothing. Every other group is mounted whether
/// visible or not; visibility only sets the `hidden` flag.
pub fn render(
    spec: &FormSpec,
    state: &SubmissionState,
    registry: &mut FieldRegistry,
) -> RenderTree {
    let fields = spec
        .elements
        .iter()
        .filter(|group| group.field.kind.has_control())
        .map(|group| {
            registry.register(&group.field.name, group.field.kind);
            render_group(spec, group, state, registry)
        })
        .collect();

    RenderTree {
        style: spec.style.clone(),
        fields,
        submit: RenderedButton {
            label: spec.button.label.clone(),
            style: spec.button.style.clone(),
            disabled: state.is_submitting,
        },
    }
}

fn render_group(
    spec: &FormSpec,
    group: &FieldGroup,
    state: &SubmissionState,
    registry: &FieldRegistry,
) -> RenderedField {
    let field = &group.field;

    let label = group.label.as_ref().map(|label| RenderedLabel {
        text: label.text.clone(),
        html_for: field.name.clone(),
        style: label.style.clone().or_else(|| spec.label_style.clone()),
    });

    let error = state
        .errors_by_field
        .get(&field.name)
        .map(|message| RenderedError {
            message: message.clone(),
            style: field
                .error_style
                .clone()
                .or_else(|| spec.error_style.clone()),
        });

    RenderedField {
        style: group.style.clone().or_else(|| spec.element_style.clone()),
        hidden: !field.visible,
        label,
        input: RenderedInput {
            id: field.name.clone(),
            name: field.name.clone(),
            kind: field.kind,
            style: field.style.clone().or_else(|| spec.input_style.clone()),
            placeholder: field.placeholder.clone(),
            value: registry.value(&field.name).cloned(),
        },
        error,
    }
}

/// Render the tree as a structured JSON-friendly value.
pub fn render_json_ui(tree: &RenderTree) -> Value {
    let fields = tree
        .fields
        .iter()
        .map(|field| {
            let mut input = Map::new();
            input.insert("id".into(), Value::String(field.input.id.clone()));
            input.insert("name".into(), Value::String(field.input.name.clone()));
            input.insert(
                "type".into(),
                Value::String(field.input.kind.input_type().to_string()),
            );
            insert_opt(&mut input, "style", &field.input.style);
            insert_opt(&mut input, "placeholder", &field.input.placeholder);
            if let Some(value) = &field.input.value {
                input.insert("value".into(), value.clone());
            }

            let mut map = Map::new();
            map.insert("hidden".into(), Value::Bool(field.hidden));
            insert_opt(&mut map, "style", &field.style);
            if let Some(label) = &field.label {
                map.insert(
                    "label".into(),
                    json!({
                        "text": label.text,
                        "for": label.html_for,
                        "style": label.style,
                    }),
                );
            }
            map.insert("input".into(), Value::Object(input));
            if let Some(error) = &field.error {
                map.insert(
                    "error".into(),
                    json!({
                        "message": error.message,
                        "style": error.style,
                    }),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "style": tree.style,
        "fields": fields,
        "submit": {
            "label": tree.submit.label,
            "style": tree.submit.style,
            "disabled": tree.submit.disabled,
        },
    })
}

/// Render the tree as HTML form markup.
pub fn render_html(tree: &RenderTree) -> String {
    let mut out = String::new();
    out.push_str("<form");
    push_class(&mut out, &tree.style);
    out.push_str(">\n");

    for field in &tree.fields {
        out.push_str("  <div");
        push_class(&mut out, &field.style);
        if field.hidden {
            out.push_str(" hidden");
        }
        out.push_str(">\n");

        if let Some(label) = &field.label {
            out.push_str(&format!("    <label for=\"{}\"", escape(&label.html_for)));
            push_class(&mut out, &label.style);
            out.push_str(&format!(">{}</label>\n", escape(&label.text)));
        }

        let input = &field.input;
        out.push_str(&format!(
            "    <input id=\"{}\" name=\"{}\" type=\"{}\"",
            escape(&input.id),
            escape(&input.name),
            input.kind.input_type()
        ));
        push_class(&mut out, &input.style);
        if let Some(placeholder) = &input.placeholder {
            out.push_str(&format!(" placeholder=\"{}\"", escape(placeholder)));
        }
        match (&input.kind, &input.value) {
            (FieldKind::Checkbox, Some(Value::Bool(true))) => out.push_str(" checked"),
            (FieldKind::Checkbox, _) | (_, None) => {}
            (_, Some(value)) => {
                let text = value_to_display(value);
                if !text.is_empty() {
                    out.push_str(&format!(" value=\"{}\"", escape(&text)));
                }
            }
        }
        out.push_str(">\n");

        if let Some(error) = &field.error {
            out.push_str("    <span");
            push_class(&mut out, &error.style);
            out.push_str(&format!(">{}</span>\n", escape(&error.message)));
        }
        out.push_str("  </div>\n");
    }

    out.push_str("  <button type=\"submit\"");
    push_class(&mut out, &tree.submit.style);
    if tree.submit.disabled {
        out.push_str(" disabled");
    }
    out.push_str(&format!(">{}</button>\n", escape(&tree.submit.label)));
    out.push_str("</form>\n");
    out
}

/// Render the tree as human-friendly text.
pub fn render_text(tree: &RenderTree) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form ({} fields)", tree.fields.len()));

    for field in &tree.fields {
        let title = field
            .label
            .as_ref()
            .map(|label| label.text.as_str())
            .unwrap_or(field.input.name.as_str());
        let mut entry = format!(
            " - {} ({}) [{}]",
            field.input.name,
            title,
            field.input.kind.input_type()
        );
        if field.hidden {
            entry.push_str(" [hidden]");
        }
        if let Some(value) = &field.input.value {
            let text = value_to_display(value);
            if !text.is_empty() {
                entry.push_str(&format!(" = {}", text));
            }
        }
        lines.push(entry);
        if let Some(error) = &field.error {
            lines.push(format!("   ! {}", error.message));
        }
    }

    let mut submit = format!("Submit: {}", tree.submit.label);
    if tree.submit.disabled {
        submit.push_str(" (disabled)");
    }
    lines.push(submit);

    lines.join("\n")
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        map.insert(key.into(), Value::String(value.clone()));
    }
}

fn push_class(out: &mut String, style: &Option<String>) {
    if let Some(style) = style {
        out.push_str(&format!(" class=\"{}\"", escape(style)));
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn value_display_flattens_scalars() {
        assert_eq!(value_to_display(&Value::String("hi".into())), "hi");
        assert_eq!(value_to_display(&json!(3)), "3");
        assert_eq!(value_to_display(&Value::Null), "");
    }
}
