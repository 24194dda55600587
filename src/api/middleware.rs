//! Bearer-token authentication resolving the request principal.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::{Error, Result};
use crate::models::Therapist;

use super::AppState;

/// The authenticated therapist, inserted as a request extension for every
/// protected route.
#[derive(Clone)]
pub struct CurrentTherapist(pub Therapist);

/// Reject requests without a valid `Authorization: Bearer <token>` header
/// and attach the resolved principal otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers()).ok_or(Error::Auth)?;
    let therapist = state
        .db
        .therapist_for_token(&token)?
        .ok_or(Error::Auth)?;

    request.extensions_mut().insert(CurrentTherapist(therapist));
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}
