use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::message::SendParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::message as MessageApi;
use domain::Id;
use service::config::ApiVersion;

use log::*;

/// POST append a message to a chat. The caller gets the stored message
/// back immediately; every participant's open channels receive the push
/// asynchronously.
#[utoipa::path(
    post,
    path = "/chats/{id}/messages",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id to send to")
    ),
    request_body = crate::params::message::SendParams,
    responses(
        (status = 201, description = "Successfully appended the Message", body = [domain::messages::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat not found"),
        (status = 409, description = "Chat is no longer active"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<SendParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Append Message to chat: {id}");

    let message = MessageApi::append(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        id,
        user_id,
        params.content,
    )
    .await?;

    debug!("Appended Message: {:?}", message.id);

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), message)))
}

/// GET a chat's full message log, ordered oldest first.
#[utoipa::path(
    get,
    path = "/chats/{id}/messages",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id to list messages for")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the Message log", body = [domain::messages::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat not found"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn index(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Messages for chat: {id}");

    domain::chat::ensure_participant(app_state.db_conn_ref(), id, user_id).await?;

    let messages = MessageApi::list(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), messages)))
}
