//! Deferral node client implementation.

use chrono::{DateTime, Utc};
use deferral_core::{DeferralError, Identity, Request, RequestId, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stream::NotificationStream;

/// Header carrying the caller's identity.
pub const CALLER_HEADER: &str = "x-deferral-caller";

/// Client for interacting with a deferral node on behalf of one identity.
#[derive(Clone)]
pub struct DeferralClient {
    /// Base URL of the node.
    base_url: String,

    /// Identity every call is made as.
    caller: Identity,

    /// HTTP client.
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    target: Identity,
    #[serde(serialize_with = "hex::serde::serialize")]
    payload: &'a [u8],
    max_cost: u64,
    deadline: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: RequestId,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    observed_cost: u64,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct AuthorityResponse {
    authority: Identity,
}

#[derive(Debug, Serialize)]
struct TransferRequest {
    new_authority: Identity,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    previous: Identity,
}

/// Error body returned by the node.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: DeferralError,
}

fn connection_error(err: reqwest::Error) -> DeferralError {
    DeferralError::Connection {
        message: err.to_string(),
    }
}

/// Turn a non-success response body into the error it carries.
pub(crate) fn decode_error(status: u16, body: &str) -> DeferralError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(body) => body.error,
        Err(_) => DeferralError::Remote {
            status,
            message: body.to_string(),
        },
    }
}

impl DeferralClient {
    /// Connect to a node, acting as `caller`.
    pub async fn connect(url: &str, caller: Identity) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        let http_client = reqwest::Client::new();

        // Verify connection with health check
        let health_url = format!("{}/health", base_url);
        http_client
            .get(&health_url)
            .send()
            .await
            .map_err(connection_error)?
            .error_for_status()
            .map_err(connection_error)?;

        debug!("Connected to deferral node at {} as {}", base_url, caller);

        Ok(Self {
            base_url,
            caller,
            http_client,
        })
    }

    /// The identity this client acts as.
    pub fn caller(&self) -> Identity {
        self.caller
    }

    /// Base URL of the node.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header(CALLER_HEADER, self.caller.to_string())
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(decode_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| DeferralError::Serialization {
                message: e.to_string(),
            })
    }

    /// Submit a new request as the client's identity.
    pub async fn submit(
        &self,
        target: Identity,
        payload: &[u8],
        max_cost: u64,
        deadline: DateTime<Utc>,
    ) -> Result<RequestId> {
        let body = SubmitRequest {
            target,
            payload,
            max_cost,
            deadline,
        };
        let response: SubmitResponse = self
            .send_json(self.http_client.post(self.url("/api/v1/requests")).json(&body))
            .await?;
        Ok(response.id)
    }

    /// Get a request. `None` if it does not exist (or was cancelled).
    pub async fn request(&self, id: RequestId) -> Result<Option<Request>> {
        let url = self.url(&format!("/api/v1/requests/{}", id));
        match self.send_json(self.http_client.get(&url)).await {
            Ok(request) => Ok(Some(request)),
            Err(DeferralError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List all live requests.
    pub async fn requests(&self) -> Result<Vec<Request>> {
        self.send_json(self.http_client.get(self.url("/api/v1/requests")))
            .await
    }

    /// Execute a request. Returns the directed call's outcome.
    pub async fn execute(&self, id: RequestId, observed_cost: u64) -> Result<bool> {
        let url = self.url(&format!("/api/v1/requests/{}/execute", id));
        let response: ExecuteResponse = self
            .send_json(
                self.http_client
                    .post(&url)
                    .json(&ExecuteRequest { observed_cost }),
            )
            .await?;
        Ok(response.success)
    }

    /// Cancel a request submitted by this client's identity.
    pub async fn cancel(&self, id: RequestId) -> Result<()> {
        let url = self.url(&format!("/api/v1/requests/{}", id));
        self.send(self.http_client.delete(&url)).await?;
        Ok(())
    }

    /// The current trigger authority.
    pub async fn trigger_authority(&self) -> Result<Identity> {
        let response: AuthorityResponse = self
            .send_json(self.http_client.get(self.url("/api/v1/authority")))
            .await?;
        Ok(response.authority)
    }

    /// Hand the trigger authority to `new_authority`. Returns the previous one.
    pub async fn transfer_trigger_authority(&self, new_authority: Identity) -> Result<Identity> {
        let response: TransferResponse = self
            .send_json(
                self.http_client
                    .put(self.url("/api/v1/authority"))
                    .json(&TransferRequest { new_authority }),
            )
            .await?;
        Ok(response.previous)
    }

    /// Open the node's notification stream.
    pub async fn events(&self) -> Result<NotificationStream> {
        let ws_url = format!(
            "{}/ws/events",
            self.base_url
                .replace("http://", "ws://")
                .replace("https://", "wss://")
        );
        NotificationStream::connect(&ws_url).await
    }
}
