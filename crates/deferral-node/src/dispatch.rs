//! HTTP directed-call dispatcher.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use deferral_core::{CallDispatcher, DirectedCall, DispatchError, Identity, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Header carrying the id of the request being executed.
pub const REQUEST_ID_HEADER: &str = "x-deferral-request-id";

/// Delivers directed calls by POSTing the payload to the target's endpoint.
///
/// A call succeeds iff the endpoint answers with a 2xx status.
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoints: HashMap<Identity, String>,
}

impl HttpDispatcher {
    /// Create a dispatcher for the given target registry.
    pub fn new(endpoints: HashMap<Identity, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Load the target registry from a JSON object of `identity -> url`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let endpoints: HashMap<Identity, String> = serde_json::from_str(&raw)?;
        Ok(Self::new(endpoints))
    }

    /// Number of registered targets.
    pub fn target_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Endpoint registered for `target`.
    pub fn endpoint(&self, target: &Identity) -> Option<&str> {
        self.endpoints.get(target).map(String::as_str)
    }
}

#[async_trait]
impl CallDispatcher for HttpDispatcher {
    async fn dispatch(&self, call: &DirectedCall) -> std::result::Result<(), DispatchError> {
        let url = self
            .endpoint(&call.target)
            .ok_or_else(|| DispatchError::new(call.target, "no endpoint registered"))?;

        debug!("Dispatching request {} to {}", call.request_id, url);

        let response = self
            .client
            .post(url)
            .header(REQUEST_ID_HEADER, call.request_id.to_string())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(call.payload.clone())
            .send()
            .await
            .map_err(|e| DispatchError::new(call.target, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::new(
                call.target,
                format!("endpoint answered {}", status),
            ));
        }

        Ok(())
    }
}
