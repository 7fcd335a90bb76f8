//! WebSocket termination for the two live-channel kinds.
//!
//! Each connection moves through Connecting -> Authenticated -> Active ->
//! Closed. Authentication happens before the upgrade completes; a failed
//! credential still upgrades, but only to deliver an explanatory close
//! frame — the channel never registers or receives data. On entering
//! Active the handler pushes one freshly computed snapshot, then answers
//! pull requests until the peer goes away. Unregistration happens exactly
//! once, on the first transition into Closed, whatever caused it.

pub(crate) mod chat_list;
pub(crate) mod chat_messages;

use crate::extractors::authenticated_user::bearer_token;
use crate::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::http::HeaderMap;
use domain::Id;
use log::*;
use push::message::Payload;
use serde::Deserialize;

/// A client-initiated pull request frame, e.g. `{"action": "get_chats"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct WsRequest {
    pub action: String,
}

/// Token source for WebSocket clients: the Authorization header when the
/// client can set one, else a `token` query parameter (browser WebSocket
/// APIs cannot set headers).
#[derive(Debug, Deserialize)]
pub(crate) struct WsAuthParams {
    pub token: Option<String>,
}

/// Outcome of the pre-upgrade handshake checks.
pub(crate) enum Handshake {
    Granted(Id),
    Denied(&'static str),
}

pub(crate) fn authenticate(
    app_state: &AppState,
    headers: &HeaderMap,
    query_token: Option<String>,
) -> Handshake {
    let token = match bearer_token(headers).or(query_token) {
        Some(token) => token,
        None => return Handshake::Denied("invalid credential"),
    };

    match domain::identity::verify(&app_state.config, &token) {
        Ok(user_id) => Handshake::Granted(user_id),
        Err(err) => {
            debug!("WebSocket credential rejected: {err}");
            Handshake::Denied("invalid credential")
        }
    }
}

/// Closes a socket that never reached Active, with the reason the client
/// should surface.
pub(crate) async fn close_denied(mut socket: WebSocket, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        })))
        .await;
}

/// Serializes a snapshot payload into a text frame.
pub(crate) fn to_frame(payload: &Payload) -> Option<Message> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Message::Text(json)),
        Err(err) => {
            error!("Failed to serialize snapshot payload: {err}");
            None
        }
    }
}
