use crate::extractors::RejectionType;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use domain::Id;
use log::*;

pub(crate) struct AuthenticatedUser(pub Id);

/// Reads the `Authorization: Bearer <token>` header from a request's parts,
/// if present.
pub(crate) fn bearer_token(parts_headers: &axum::http::HeaderMap) -> Option<String> {
    parts_headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = RejectionType;

    // This extractor asserts the caller's identity on every request: it
    // hands the bearer token to the identity collaborator and yields the
    // user id it vouches for. No session state is kept server-side.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

        match domain::identity::verify(&app_state.config, &token) {
            Ok(user_id) => Ok(AuthenticatedUser(user_id)),
            Err(err) => {
                debug!("Identity verification failed: {err}");
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}
