//! Authenticated REST calls
//!
//! Every call reuses whatever token the provider currently holds. Failures
//! come back as `RequestError` values and never reach the gateway loop.

use crate::auth::{authorize, TokenProvider};
use crate::error::RequestError;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Response header the platform uses for request tracing
pub const TRACE_ID_HEADER: &str = "X-Tps-trace-ID";

/// Error body returned by the REST surface
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    trace_id: Option<String>,
}

/// Issues authenticated POSTs against the platform REST API
#[derive(Debug, Clone)]
pub struct RequestSender {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<TokenProvider>,
}

impl RequestSender {
    #[must_use]
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// POST `body` to `{api_base}{path}` and return the decoded JSON response
    /// (`null` for an empty body).
    pub async fn send_request(&self, path: &str, body: &Value) -> Result<Value, RequestError> {
        let result = self.post(path, body).await;

        if let Err(err) = &result {
            tracing::warn!(path = %path, status = ?err.status(), error = %err, "REST request failed");
        }

        result
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RequestError> {
        let token = self.tokens.current().ok_or(RequestError::NoToken)?;
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));

        tracing::debug!(path = %path, "Sending REST request");

        let builder = authorize(self.http.post(&url), &token.value, self.tokens.app_id());
        let response = builder.json(body).send().await?;

        let status = response.status();
        let header_trace_id = response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text, header_trace_id));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| RequestError::Decode(e.to_string()))
    }
}

fn status_error(status: u16, text: &str, header_trace_id: Option<String>) -> RequestError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => RequestError::Status {
            status,
            code: body.code,
            message: body.message.unwrap_or_else(|| text.to_string()),
            trace_id: body.trace_id.or(header_trace_id),
        },
        Err(_) => RequestError::Status {
            status,
            code: None,
            message: text.to_string(),
            trace_id: header_trace_id,
        },
    }
}
