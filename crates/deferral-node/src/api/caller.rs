//! Caller identity extraction.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use deferral_core::{DeferralError, Identity};

use super::ApiError;

/// Header carrying the caller's identity.
pub const CALLER_HEADER: &str = "x-deferral-caller";

/// The identity on whose behalf a request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| DeferralError::malformed(format!("missing {} header", CALLER_HEADER)))?;

        let text = value
            .to_str()
            .map_err(|e| DeferralError::malformed(format!("{} header: {}", CALLER_HEADER, e)))?;

        Ok(Caller(text.trim().parse()?))
    }
}
