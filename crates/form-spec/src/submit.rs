use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::defaults::{DefaultValueMap, resolve_defaults};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{FormError, SchemaError, SubmitError};
use crate::render::{RenderTree, render};
use crate::spec::form::FormSpec;
use crate::validate::{FieldErrors, FieldRegistry, FormData, Validator};

const CREATED: u16 = 201;

/// Steps of one submit cycle. Every cycle ends back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
    #[default]
    Idle,
    Validating,
    Invalid,
    CallingRemote,
    Succeeded,
    Failed,
}

/// Per-form mutable state observed by the render engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionState {
    pub is_submitting: bool,
    pub errors_by_field: FieldErrors,
    pub phase: SubmitPhase,
}

/// Network-response-like value returned by a [`SubmitAction`].
#[async_trait]
pub trait RemoteResponse: Send {
    fn status(&self) -> u16;
    async fn json(self: Box<Self>) -> Result<Value, SubmitError>;
}

/// Externally owned function performing the actual remote call.
#[async_trait]
pub trait SubmitAction: Send + Sync {
    async fn call(&self, payload: FormData) -> Result<Box<dyn RemoteResponse>, SubmitError>;
}

/// In-memory response carrying a raw body that is decoded on demand.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    status: u16,
    body: String,
}

impl JsonResponse {
    pub fn new(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
impl RemoteResponse for JsonResponse {
    fn status(&self) -> u16 {
        self.status
    }

    async fn json(self: Box<Self>) -> Result<Value, SubmitError> {
        serde_json::from_str(&self.body).map_err(SubmitError::Decode)
    }
}

/// Callback receiving the decoded body of a successful submission.
pub type ResponseHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// What a submit cycle ended with. Only `Invalid` is reflected in
/// [`SubmissionState::errors_by_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Invalid(FieldErrors),
    Succeeded(Value),
    Rejected { status: u16, body: Value },
    Failed(String),
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status) || status == CREATED
}

/// Builds the payload sent to the submit action.
///
/// Defaults are applied after the validated data, so a field default wins over
/// whatever the user entered for the same name. Hidden fields rely on this to
/// carry fixed values such as ids or flags.
pub fn merge_defaults(validated: FormData, defaults: DefaultValueMap) -> FormData {
    let mut payload = validated;
    payload.extend(defaults);
    payload
}

/// Binds a form description to its validator, submit action and optional
/// response handler, and drives the submit state machine.
pub struct FormController {
    spec: FormSpec,
    validator: Validator,
    action: Arc<dyn SubmitAction>,
    on_response: Option<ResponseHandler>,
    diagnostics: Arc<dyn DiagnosticSink>,
    registry: FieldRegistry,
    state: watch::Sender<SubmissionState>,
}

impl FormController {
    pub fn new<A>(spec: FormSpec, validator: Validator, action: A) -> Self
    where
        A: SubmitAction + 'static,
    {
        let (state, _) = watch::channel(SubmissionState::default());
        Self {
            spec,
            validator,
            action: Arc::new(action),
            on_response: None,
            diagnostics: Arc::new(TracingSink),
            registry: FieldRegistry::new(),
            state,
        }
    }

    pub fn with_response_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(handler));
        self
    }

    pub fn with_diagnostics<D>(mut self, sink: D) -> Self
    where
        D: DiagnosticSink + 'static,
    {
        self.diagnostics = Arc::new(sink);
        self
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Renders the form and registers every control it mounts.
    pub fn render(&mut self) -> RenderTree {
        let state = self.state.borrow();
        render(&self.spec, &state, &mut self.registry)
    }

    /// Writes a control value, as user input would.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        self.registry.set_value(name, value)
    }

    /// Runs one submit cycle over the currently registered values.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let data = self.registry.values();
        self.transition(SubmitPhase::Validating, |state| state.is_submitting = true);

        let validated = match self.validator.validate(&data) {
            Ok(validated) => validated,
            Err(SchemaError::Invalid(errors)) => {
                self.transition(SubmitPhase::Invalid, |state| {
                    state.errors_by_field = errors.clone();
                    state.is_submitting = false;
                });
                self.transition(SubmitPhase::Idle, |_| {});
                return SubmitOutcome::Invalid(errors);
            }
            Err(err) => return self.fail(SubmitError::from(err)),
        };

        self.transition(SubmitPhase::CallingRemote, |state| {
            state.errors_by_field.clear();
        });
        let payload = merge_defaults(validated, resolve_defaults(self.spec.fields()));

        match self.call_remote(payload).await {
            Ok(outcome) => {
                let phase = if outcome.is_success() {
                    SubmitPhase::Succeeded
                } else {
                    SubmitPhase::Failed
                };
                self.settle(phase);
                outcome
            }
            Err(err) => self.fail(err),
        }
    }

    async fn call_remote(&self, payload: FormData) -> Result<SubmitOutcome, SubmitError> {
        let response = self.action.call(payload).await?;
        let status = response.status();
        let body = response.json().await?;

        if is_success_status(status) {
            if let Some(handler) = &self.on_response {
                handler(&body);
            }
            Ok(SubmitOutcome::Succeeded(body))
        } else {
            self.diagnostics.record(Diagnostic::RemoteRejection {
                status,
                body: body.clone(),
            });
            Ok(SubmitOutcome::Rejected { status, body })
        }
    }

    fn fail(&mut self, err: SubmitError) -> SubmitOutcome {
        let message = err.to_string();
        self.diagnostics.record(Diagnostic::SubmitFailure {
            message: message.clone(),
        });
        self.settle(SubmitPhase::Failed);
        SubmitOutcome::Failed(message)
    }

    fn settle(&mut self, phase: SubmitPhase) {
        self.transition(phase, |state| state.is_submitting = false);
        self.transition(SubmitPhase::Idle, |_| {});
    }

    fn transition(&self, phase: SubmitPhase, update: impl FnOnce(&mut SubmissionState)) {
        debug!(?phase, "submit transition");
        self.state.send_modify(|state| {
            update(state);
            state.phase = phase;
        });
    }
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("spec", &self.spec)
            .field("registry", &self.registry)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
