use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::exchange::TransitionParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::exchange as ExchangeApi;
use domain::Id;
use serde_json::json;
use service::config::ApiVersion;

use log::*;

/// GET a chat's exchange status plus the caller's own confirmation flag.
#[utoipa::path(
    get,
    path = "/chats/{id}/exchange",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id whose exchange to read")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the Exchange status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat or Exchange not found"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn read(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Exchange status for chat: {id}");

    let status = ExchangeApi::get_status(app_state.db_conn_ref(), id).await?;
    let has_user_confirmed =
        ExchangeApi::has_user_confirmed(app_state.db_conn_ref(), id, user_id).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({"status": status, "has_user_confirmed": has_user_confirmed}),
    )))
}

/// PUT request a lifecycle transition (accept or cancel) on a chat's
/// exchange. Direct requests for `completed` are rejected; completion only
/// derives from both sides confirming.
#[utoipa::path(
    put,
    path = "/chats/{id}/exchange",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id whose exchange to transition")
    ),
    request_body = crate::params::exchange::TransitionParams,
    responses(
        (status = 200, description = "Successfully transitioned the Exchange"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat or Exchange not found"),
        (status = 422, description = "Transition not allowed from the current status"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_status(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<TransitionParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Transition Exchange for chat {id} to {}", params.status);

    let status = ExchangeApi::request_transition(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        id,
        params.status,
        user_id,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({"status": status}),
    )))
}

/// POST record the caller's completion vote. When the counterpart has
/// already confirmed, the exchange atomically becomes completed.
#[utoipa::path(
    post,
    path = "/chats/{id}/exchange/confirm",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id whose exchange to confirm")
    ),
    responses(
        (status = 200, description = "Successfully recorded the confirmation", body = [domain::exchanges::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat or Exchange not found"),
        (status = 422, description = "Exchange already terminal"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn confirm(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Confirm Exchange for chat: {id}");

    let exchange = ExchangeApi::confirm(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        id,
        user_id,
    )
    .await?;

    debug!("Exchange after confirmation: {:?}", exchange.status);

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), exchange)))
}

/// POST cancel a chat's exchange; shorthand for requesting the `cancelled`
/// transition.
#[utoipa::path(
    post,
    path = "/chats/{id}/exchange/cancel",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id whose exchange to cancel")
    ),
    responses(
        (status = 200, description = "Successfully cancelled the Exchange"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat or Exchange not found"),
        (status = 422, description = "Exchange already terminal"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Cancel Exchange for chat: {id}");

    let status = ExchangeApi::cancel(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        id,
        user_id,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({"status": status}),
    )))
}
