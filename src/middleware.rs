use axum::{extract::Request, middleware::Next, response::IntoResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorMessage, HttpError};

/// Header set by the upstream authenticator with the caller's user id.
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// Already-authenticated caller of a request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
}

pub async fn auth(mut req: Request, next: Next) -> Result<impl IntoResponse, HttpError> {
    let raw = req
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::PrincipalNotProvided.to_string()))?;

    let user_id = Uuid::parse_str(raw.trim())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidPrincipal.to_string()))?;

    req.extensions_mut().insert(AuthPrincipal { user_id });

    Ok(next.run(req).await)
}
