use crate::extractors::authenticated_user::bearer_token;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authentication middleware that returns 401 Unauthorized for requests
/// without a verifiable bearer token.
///
/// Controllers still extract `AuthenticatedUser` for the caller's id; this
/// layer exists so unauthenticated requests are rejected uniformly before
/// any handler logic runs.
pub async fn require_auth(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let verified = bearer_token(request.headers())
        .and_then(|token| domain::identity::verify(&app_state.config, &token).ok());

    match verified {
        Some(_user_id) => next.run(request).await,
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
