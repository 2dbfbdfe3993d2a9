use async_trait::async_trait;
use form_spec::{FormData, JsonResponse, RemoteResponse, SubmitAction, SubmitError};
use serde_json::Value;
use tracing::debug;

/// Posts the payload as JSON to a fixed endpoint.
///
/// No client timeout is configured: a hung endpoint keeps the form in its
/// submitting state.
pub struct HttpAction {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAction {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SubmitAction for HttpAction {
    async fn call(&self, payload: FormData) -> Result<Box<dyn RemoteResponse>, SubmitError> {
        debug!(endpoint = %self.endpoint, fields = payload.len(), "posting form payload");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        Ok(Box::new(HttpResponse(response)))
    }
}

struct HttpResponse(reqwest::Response);

#[async_trait]
impl RemoteResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    async fn json(self: Box<Self>) -> Result<Value, SubmitError> {
        let bytes = self
            .0
            .bytes()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(SubmitError::Decode)
    }
}

/// Answers every submission with `201 Created`, echoing the payload.
pub struct EchoAction;

#[async_trait]
impl SubmitAction for EchoAction {
    async fn call(&self, payload: FormData) -> Result<Box<dyn RemoteResponse>, SubmitError> {
        Ok(Box::new(JsonResponse::new(201, &Value::Object(payload))))
    }
}
