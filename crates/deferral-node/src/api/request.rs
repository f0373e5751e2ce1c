//! Request API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use deferral_core::{DeferralError, Identity, Request, RequestId};
use serde::{Deserialize, Serialize};

use super::{ApiError, Caller};
use crate::state::AppState;

/// Request to submit a new deferred call.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequestBody {
    /// Who the directed call will be aimed at.
    pub target: Identity,

    /// Hex-encoded call payload.
    #[serde(default, with = "hex::serde")]
    pub payload: Vec<u8>,

    /// Highest acceptable execution cost.
    pub max_cost: u64,

    /// Last instant at which execution is allowed.
    pub deadline: DateTime<Utc>,
}

/// Response after submitting a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: RequestId,
}

/// Body of an execute call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteBody {
    /// Execution cost as observed by the trigger authority right now.
    pub observed_cost: u64,
}

/// Response after executing a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub id: RequestId,
    pub success: bool,
}

fn parse_id(raw: &str) -> Result<RequestId, ApiError> {
    raw.parse::<RequestId>().map_err(ApiError::from)
}

/// Submit a new request.
pub async fn submit_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = state
        .ledger
        .submit(caller, body.target, body.payload, body.max_cost, body.deadline)
        .await?;

    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

/// Get a request by id.
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Request>, ApiError> {
    let id = parse_id(&id)?;
    let request = state
        .ledger
        .request(&id)
        .await
        .ok_or(DeferralError::NotFound { id })?;

    Ok(Json(request))
}

/// List all live requests.
pub async fn list_requests(State(state): State<AppState>) -> Json<Vec<Request>> {
    Json(state.ledger.requests().await)
}

/// Execute a request. Only the trigger authority may call this.
pub async fn execute_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let id = parse_id(&id)?;
    let success = state
        .ledger
        .execute(caller, id, body.observed_cost)
        .await?;

    Ok(Json(ExecuteResponse { id, success }))
}

/// Cancel a request. Only its submitter may call this.
pub async fn cancel_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.ledger.cancel(caller, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use chrono::Duration;
    use deferral_core::RequestState;

    use super::*;
    use crate::api::error::ErrorBody;
    use crate::api::CALLER_HEADER;
    use crate::testing::{authority, test_state, user};

    fn server() -> TestServer {
        TestServer::new(crate::create_router(test_state(true))).unwrap()
    }

    fn as_caller(identity: Identity) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(CALLER_HEADER),
            HeaderValue::from_str(&identity.to_string()).unwrap(),
        )
    }

    fn target() -> Identity {
        Identity::from_bytes([0x77; 20])
    }

    async fn submit(server: &TestServer, max_cost: u64, ttl: Duration) -> RequestId {
        let (name, value) = as_caller(user());
        let response = server
            .post("/api/v1/requests")
            .add_header(name, value)
            .json(&SubmitRequestBody {
                target: target(),
                payload: vec![0xca, 0xfe],
                max_cost,
                deadline: Utc::now() + ttl,
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<SubmitResponse>().id
    }

    #[tokio::test]
    async fn test_submit_and_get() {
        let server = server();
        let id = submit(&server, 100, Duration::hours(1)).await;

        let response = server.get(&format!("/api/v1/requests/{}", id)).await;
        response.assert_status_ok();
        let request = response.json::<Request>();
        assert_eq!(request.id, id);
        assert_eq!(request.submitter, user());
        assert_eq!(request.payload, vec![0xca, 0xfe]);
        assert_eq!(request.state, RequestState::Pending);

        let list = server.get("/api/v1/requests").await.json::<Vec<Request>>();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_requires_caller_header() {
        let server = server();
        let response = server
            .post("/api/v1/requests")
            .json(&SubmitRequestBody {
                target: target(),
                payload: vec![],
                max_cost: 1,
                deadline: Utc::now() + Duration::hours(1),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(matches!(
            response.json::<ErrorBody>().error,
            DeferralError::Malformed { .. }
        ));
    }

    #[tokio::test]
    async fn test_submit_past_deadline() {
        let server = server();
        let (name, value) = as_caller(user());
        let response = server
            .post("/api/v1/requests")
            .add_header(name, value)
            .json(&SubmitRequestBody {
                target: target(),
                payload: vec![],
                max_cost: 1,
                deadline: Utc::now() - Duration::seconds(5),
            })
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(matches!(
            response.json::<ErrorBody>().error,
            DeferralError::InvalidDeadline { .. }
        ));
    }

    #[tokio::test]
    async fn test_execute_flow() {
        let server = server();
        let id = submit(&server, 100, Duration::hours(1)).await;
        let path = format!("/api/v1/requests/{}/execute", id);

        let (name, value) = as_caller(user());
        server
            .post(&path)
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 50 })
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (name, value) = as_caller(authority());
        let response = server
            .post(&path)
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 50 })
            .await;
        response.assert_status_ok();
        let executed = response.json::<ExecuteResponse>();
        assert_eq!(executed.id, id);
        assert!(executed.success);

        let (name, value) = as_caller(authority());
        let response = server
            .post(&path)
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 50 })
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(
            response.json::<ErrorBody>().error,
            DeferralError::AlreadyExecuted { id }
        );
    }

    #[tokio::test]
    async fn test_execute_over_cost() {
        let server = server();
        let id = submit(&server, 10, Duration::hours(1)).await;

        let (name, value) = as_caller(authority());
        let response = server
            .post(&format!("/api/v1/requests/{}/execute", id))
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 11 })
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.json::<ErrorBody>().error,
            DeferralError::CostExceeded {
                id,
                observed: 11,
                max: 10
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_flow() {
        let server = server();
        let id = submit(&server, 100, Duration::hours(1)).await;
        let path = format!("/api/v1/requests/{}", id);

        let (name, value) = as_caller(authority());
        server
            .delete(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (name, value) = as_caller(user());
        server
            .delete(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);

        let (name, value) = as_caller(authority());
        server
            .post(&format!("{}/execute", path))
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 1 })
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refused_call_still_executes() {
        let server = TestServer::new(crate::create_router(test_state(false))).unwrap();
        let id = submit(&server, 100, Duration::hours(1)).await;
        let path = format!("/api/v1/requests/{}/execute", id);

        let (name, value) = as_caller(authority());
        let response = server
            .post(&path)
            .add_header(name, value)
            .json(&ExecuteBody { observed_cost: 1 })
            .await;
        response.assert_status_ok();
        assert!(!response.json::<ExecuteResponse>().success);

        let request = server
            .get(&format!("/api/v1/requests/{}", id))
            .await
            .json::<Request>();
        assert_eq!(request.state, RequestState::Executed);
    }

    #[tokio::test]
    async fn test_malformed_id() {
        let server = server();
        let response = server.get("/api/v1/requests/not-an-id").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
