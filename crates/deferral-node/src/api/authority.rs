//! Trigger authority endpoints.

use axum::{extract::State, Json};
use deferral_core::Identity;
use serde::{Deserialize, Serialize};

use super::{ApiError, Caller};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorityResponse {
    pub authority: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferBody {
    pub new_authority: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub previous: Identity,
    pub current: Identity,
}

/// Current trigger authority.
pub async fn get_authority(State(state): State<AppState>) -> Json<AuthorityResponse> {
    Json(AuthorityResponse {
        authority: state.ledger.trigger_authority().await,
    })
}

/// Hand the trigger authority to a new identity.
pub async fn transfer_authority(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<TransferBody>,
) -> Result<Json<TransferResponse>, ApiError> {
    let previous = state
        .ledger
        .transfer_trigger_authority(caller, body.new_authority)
        .await?;

    Ok(Json(TransferResponse {
        previous,
        current: body.new_authority,
    }))
}
