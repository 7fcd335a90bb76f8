//! The fan-out orchestrator: turns domain events into per-participant view
//! refreshes.
//!
//! Chat summaries and confirmation flags are viewer-dependent, so this
//! handler recomputes each participant's view from the authoritative state
//! instead of forwarding one shared payload. There is no cached view
//! anywhere to invalidate; what gets pushed is what a fresh pull would
//! return.

use crate::manager::Manager;
use crate::message::{Message as PushMessage, MessageScope, Payload};
use async_trait::async_trait;
use domain::error::{DomainErrorKind, EntityErrorKind, Error as DomainError, InternalErrorKind};
use events::{DomainEvent, EventHandler};
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Fresh chat-directory payload for one user.
pub async fn chat_list_snapshot(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Payload, DomainError> {
    let chats = domain::chat::active_chats_for(db, user_id).await?;

    Ok(Payload::ChatList {
        chats: serde_json::to_value(chats)?,
    })
}

/// Fresh message-view payload for one chat as seen by `user_id`: the
/// ordered log, the exchange status, and the user's own confirmation flag.
pub async fn message_list_snapshot(
    db: &DatabaseConnection,
    chat_id: Uuid,
    user_id: Uuid,
) -> Result<Payload, DomainError> {
    let messages = domain::message::list(db, chat_id).await?;
    let status = domain::exchange::status_or_cancelled(db, chat_id).await?;

    let has_user_confirmed = match domain::exchange::has_user_confirmed(db, chat_id, user_id).await
    {
        Ok(confirmed) => confirmed,
        // Defensive, mirroring status_or_cancelled: no exchange row reads
        // as "not confirmed" rather than failing the whole snapshot.
        Err(DomainError {
            error_kind:
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)),
            ..
        }) => false,
        Err(err) => return Err(err),
    };

    Ok(Payload::MessageList {
        chat_id: chat_id.to_string(),
        messages: serde_json::to_value(messages)?,
        exchange_status: status.to_string(),
        has_user_confirmed,
    })
}

/// Handles domain events by recomputing the affected participants' views
/// and pushing them through the connection registry.
///
/// One participant's failure (to compute or to deliver) is logged and never
/// aborts the loop over the other participants.
pub struct FanoutHandler {
    push_manager: Arc<Manager>,
    db: Arc<DatabaseConnection>,
}

impl FanoutHandler {
    pub fn new(push_manager: Arc<Manager>, db: Arc<DatabaseConnection>) -> Self {
        Self { push_manager, db }
    }

    fn push_chat_list(&self, user_id: Uuid, payload: Payload) {
        self.push_manager.send_message(PushMessage {
            payload,
            scope: MessageScope::ChatList { user_id },
        });
    }

    fn push_chat_messages(&self, user_id: Uuid, chat_id: Uuid, payload: Payload) {
        self.push_manager.send_message(PushMessage {
            payload,
            scope: MessageScope::ChatMessages { user_id, chat_id },
        });
    }

    async fn fan_out_chat_created(&self, chat_id: Uuid, notify_user_ids: &[Uuid]) {
        let chat = match domain::chat::find_by_id(self.db.as_ref(), chat_id).await {
            Ok(chat) => chat,
            Err(e) => {
                warn!("Fan-out skipped: chat {chat_id} not readable: {e}");
                return;
            }
        };

        for &user_id in notify_user_ids {
            match domain::chat::summarize_for(self.db.as_ref(), &chat, user_id).await {
                Ok(summary) => match serde_json::to_value(summary) {
                    Ok(chat) => self.push_chat_list(user_id, Payload::ChatItem { chat }),
                    Err(e) => warn!("Fan-out to {user_id} skipped: {e}"),
                },
                Err(e) => warn!("Fan-out to {user_id} skipped: {e}"),
            }
        }
    }

    async fn fan_out_message_appended(
        &self,
        chat_id: Uuid,
        message: &serde_json::Value,
        notify_user_ids: &[Uuid],
    ) {
        for &user_id in notify_user_ids {
            self.push_chat_messages(
                user_id,
                chat_id,
                Payload::MessageItem {
                    chat_id: chat_id.to_string(),
                    message: message.clone(),
                },
            );

            // Last-message preview and ordering changed for the directory
            match chat_list_snapshot(self.db.as_ref(), user_id).await {
                Ok(payload) => self.push_chat_list(user_id, payload),
                Err(e) => warn!("Chat-list fan-out to {user_id} skipped: {e}"),
            }
        }
    }

    async fn fan_out_exchange_transitioned(&self, chat_id: Uuid, notify_user_ids: &[Uuid]) {
        for &user_id in notify_user_ids {
            match message_list_snapshot(self.db.as_ref(), chat_id, user_id).await {
                Ok(payload) => self.push_chat_messages(user_id, chat_id, payload),
                Err(e) => warn!("Message-list fan-out to {user_id} skipped: {e}"),
            }

            match chat_list_snapshot(self.db.as_ref(), user_id).await {
                Ok(payload) => self.push_chat_list(user_id, payload),
                Err(e) => warn!("Chat-list fan-out to {user_id} skipped: {e}"),
            }
        }
    }
}

#[async_trait]
impl EventHandler for FanoutHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ChatCreated {
                chat_id,
                notify_user_ids,
            } => {
                debug!("Handling ChatCreated event for chat {chat_id}");
                self.fan_out_chat_created(*chat_id, notify_user_ids).await;
            }

            DomainEvent::MessageAppended {
                chat_id,
                message,
                notify_user_ids,
            } => {
                debug!("Handling MessageAppended event for chat {chat_id}");
                self.fan_out_message_appended(*chat_id, message, notify_user_ids)
                    .await;
            }

            DomainEvent::ExchangeTransitioned {
                chat_id,
                status,
                notify_user_ids,
            } => {
                debug!("Handling ExchangeTransitioned({status}) event for chat {chat_id}");
                self.fan_out_exchange_transitioned(*chat_id, notify_user_ids)
                    .await;
            }
        }
    }
}
