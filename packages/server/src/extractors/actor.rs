use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Acting user identity taken from the `X-Actor-Email` header.
///
/// Authentication happens upstream of this service; the gateway forwards the
/// verified identity in a header. Add this as a handler parameter on every
/// mutating design endpoint.
pub struct ActorEmail(pub String);

impl<S> FromRequestParts<S> for ActorEmail
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get("X-Actor-Email")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.contains('@'))
            .ok_or_else(|| {
                AppError::Validation("Missing or malformed X-Actor-Email header".into())
            })?;

        Ok(ActorEmail(email.to_string()))
    }
}
