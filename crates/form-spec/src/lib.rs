#![allow(missing_docs)]

pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod render;
pub mod rules;
pub mod spec;
pub mod submit;
pub mod validate;

pub use defaults::{DefaultValueMap, resolve_defaults};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use error::{FormError, SchemaError, SubmitError};
pub use render::{
    RenderTree, RenderedButton, RenderedError, RenderedField, RenderedInput, RenderedLabel,
    render, render_html, render_json_ui, render_text,
};
pub use rules::{FieldRules, RuleSchema};
pub use spec::{FieldGroup, FieldKind, FieldSpec, FormSpec, Label, SubmitButton};
pub use submit::{
    FormController, JsonResponse, RemoteResponse, ResponseHandler, SubmissionState, SubmitAction,
    SubmitOutcome, SubmitPhase, merge_defaults,
};
pub use validate::{
    FieldErrors, FieldRegistry, FormData, ValidationSchema, Validator, accept_all, make_validator,
};
