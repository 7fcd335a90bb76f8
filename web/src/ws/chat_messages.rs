use super::{authenticate, close_denied, to_frame, Handshake, WsAuthParams, WsRequest};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use domain::error::DomainErrorKind;
use domain::Id;
use futures::{SinkExt, StreamExt};
use log::*;
use push::connection::ChannelKind;
use push::fanout::message_list_snapshot;
use tokio::sync::mpsc;

/// GET /ws/chats/:chat_id/messages — the message channel of one chat.
/// Participants only. Pushes one snapshot (ordered log + exchange status +
/// the caller's confirmation flag) on connect, answers
/// `{"action": "get_messages"}` pulls, and receives `message_list` /
/// `message_item` pushes on every mutation of this chat.
pub(crate) async fn chat_messages_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Path(chat_id): Path<Id>,
    Query(params): Query<WsAuthParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let handshake = match authenticate(&app_state, &headers, params.token) {
        Handshake::Granted(user_id) => {
            // Only the chat's two participants may watch its messages
            match domain::chat::ensure_participant(app_state.db_conn_ref(), chat_id, user_id)
                .await
            {
                Ok(_) => Handshake::Granted(user_id),
                Err(err) if err.error_kind == DomainErrorKind::Forbidden => {
                    Handshake::Denied("forbidden")
                }
                Err(err) => {
                    debug!("Message channel handshake failed for chat {chat_id}: {err}");
                    Handshake::Denied("unknown chat")
                }
            }
        }
        denied => denied,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, app_state, chat_id, handshake))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: AppState,
    chat_id: Id,
    handshake: Handshake,
) {
    let user_id = match handshake {
        Handshake::Granted(user_id) => user_id,
        Handshake::Denied(reason) => {
            close_denied(socket, reason).await;
            return;
        }
    };

    debug!("Message channel opening for user {user_id} on chat {chat_id}");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let snapshot_tx = tx.clone();
    let connection_id = app_state.push_manager.register_connection(
        user_id,
        ChannelKind::ChatMessages { chat_id },
        tx,
    );

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Initial snapshot on entering Active
    send_message_list(&app_state, chat_id, user_id, &snapshot_tx).await;

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsRequest>(&text) {
                Ok(request) if request.action == "get_messages" => {
                    send_message_list(&app_state, chat_id, user_id, &snapshot_tx).await;
                }
                Ok(request) => {
                    debug!(
                        "Ignoring unknown action {:?} on message channel",
                        request.action
                    );
                }
                Err(err) => debug!("Ignoring unparseable frame on message channel: {err}"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("Message channel transport error for {user_id}: {err}");
                break;
            }
        }
    }

    // Closed: unregister exactly once, then stop the writer
    app_state.push_manager.unregister_connection(&connection_id);
    send_task.abort();
    debug!("Message channel closed for user {user_id} on chat {chat_id}");
}

async fn send_message_list(
    app_state: &AppState,
    chat_id: Id,
    user_id: Id,
    out: &mpsc::UnboundedSender<Message>,
) {
    match message_list_snapshot(app_state.db_conn_ref(), chat_id, user_id).await {
        Ok(payload) => {
            if let Some(frame) = to_frame(&payload) {
                let _ = out.send(frame);
            }
        }
        Err(err) => warn!("Failed to compute message list for chat {chat_id}: {err}"),
    }
}
