use super::{authenticate, close_denied, to_frame, Handshake, WsAuthParams, WsRequest};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use domain::Id;
use futures::{SinkExt, StreamExt};
use log::*;
use push::connection::ChannelKind;
use push::fanout::chat_list_snapshot;
use tokio::sync::mpsc;

/// GET /ws/chats — the chat-directory channel. Pushes one snapshot on
/// connect, answers `{"action": "get_chats"}` pulls, and receives
/// `chat_list` / `chat_item` pushes whenever a mutation touches one of the
/// user's chats.
pub(crate) async fn chat_list_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(params): Query<WsAuthParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let handshake = authenticate(&app_state, &headers, params.token);

    ws.on_upgrade(move |socket| handle_socket(socket, app_state, handshake))
}

async fn handle_socket(socket: WebSocket, app_state: AppState, handshake: Handshake) {
    let user_id = match handshake {
        Handshake::Granted(user_id) => user_id,
        Handshake::Denied(reason) => {
            close_denied(socket, reason).await;
            return;
        }
    };

    debug!("Chat-directory channel opening for user {user_id}");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // The handler's own sends and the fan-out's pushes share one queue,
    // drained by a single writer task, so frames never interleave.
    let snapshot_tx = tx.clone();
    let connection_id =
        app_state
            .push_manager
            .register_connection(user_id, ChannelKind::ChatList, tx);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Initial snapshot on entering Active
    send_chat_list(&app_state, user_id, &snapshot_tx).await;

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsRequest>(&text) {
                Ok(request) if request.action == "get_chats" => {
                    send_chat_list(&app_state, user_id, &snapshot_tx).await;
                }
                Ok(request) => {
                    debug!("Ignoring unknown action {:?} on chat channel", request.action);
                }
                Err(err) => debug!("Ignoring unparseable frame on chat channel: {err}"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("Chat-directory channel transport error for {user_id}: {err}");
                break;
            }
        }
    }

    // Closed: unregister exactly once, then stop the writer
    app_state.push_manager.unregister_connection(&connection_id);
    send_task.abort();
    debug!("Chat-directory channel closed for user {user_id}");
}

async fn send_chat_list(
    app_state: &AppState,
    user_id: Id,
    out: &mpsc::UnboundedSender<Message>,
) {
    match chat_list_snapshot(app_state.db_conn_ref(), user_id).await {
        Ok(payload) => {
            if let Some(frame) = to_frame(&payload) {
                let _ = out.send(frame);
            }
        }
        Err(err) => warn!("Failed to compute chat list for {user_id}: {err}"),
    }
}
