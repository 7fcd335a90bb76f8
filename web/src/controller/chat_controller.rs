use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::chat::CreateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::chat as ChatApi;
use domain::Id;
use service::config::ApiVersion;

use log::*;

/// POST open a conversation about a listing. Returns the chat with its
/// exchange; 201 when newly created, 200 when a live one already existed
/// for this caller and book (duplicate "start chat" taps).
#[utoipa::path(
    post,
    path = "/chats",
    params(ApiVersion),
    request_body = crate::params::chat::CreateParams,
    responses(
        (status = 201, description = "Successfully opened a new Chat and Exchange", body = [domain::chats::Model]),
        (status = 200, description = "Returned the existing live Chat for this listing", body = [domain::chats::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Caller is the listing owner"),
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
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Open a Chat on book: {:?}", params.book_id);

    let creation = ChatApi::find_or_create(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        params.book_id,
        user_id,
    )
    .await?;

    let status_code = if creation.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    debug!("Chat for book {}: {:?}", params.book_id, creation.chat.id);

    Ok(Json(ApiResponse::new(status_code.into(), creation)))
}

/// GET the conversation-header preview of a chat: the book and the
/// counterpart, from the caller's point of view.
#[utoipa::path(
    get,
    path = "/chats/{id}",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Chat id to preview")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the Chat preview"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Chat not found"),
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
    debug!("GET Chat preview by id: {id}");

    let preview = ChatApi::preview_for(app_state.db_conn_ref(), id, user_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), preview)))
}
