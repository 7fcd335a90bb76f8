//! The exchange lifecycle state machine.
//!
//! One exchange per chat, created with it. Status moves through
//! `pending -> accepted -> completed` with `cancelled` reachable from any
//! live state. Completion is never requested directly: it is derived from
//! both sides' confirmation votes inside the same atomic update that
//! records a vote.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::exchange_status::ExchangeStatus;
use crate::exchanges::Model;
use entity_api::{chat, exchange};
use events::{DomainEvent, EventPublisher};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};

pub use entity_api::exchange::find_by_chat_id;

/// The allowed-successor table. Terminal states have no successors.
pub fn allowed_successors(status: ExchangeStatus) -> &'static [ExchangeStatus] {
    match status {
        ExchangeStatus::Pending => &[ExchangeStatus::Accepted, ExchangeStatus::Cancelled],
        ExchangeStatus::Accepted => &[ExchangeStatus::Completed, ExchangeStatus::Cancelled],
        ExchangeStatus::Completed | ExchangeStatus::Cancelled => &[],
    }
}

/// Status resulting from the given pair of confirmation votes, for an
/// exchange that is still live. Invoked inside the same update that writes
/// a vote, so both-votes-in and the completed status land as one write.
pub(crate) fn resolved_status(offerer_confirmed: bool, interested_confirmed: bool) -> ExchangeStatus {
    if offerer_confirmed && interested_confirmed {
        ExchangeStatus::Completed
    } else {
        ExchangeStatus::Accepted
    }
}

fn txn_error(err: sea_orm::DbErr) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
            EntityErrorKind::DbTransaction,
        )),
    }
}

/// Moves the chat's exchange to `requested` on behalf of `requesting_user_id`.
///
/// Completion is rejected here regardless of the current status — it is
/// only reachable through [`confirm`]. The current status is re-read under
/// a row lock so two concurrent transitions on one chat serialize.
pub async fn request_transition(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    chat_id: crate::Id,
    requested: ExchangeStatus,
    requesting_user_id: crate::Id,
) -> Result<ExchangeStatus, Error> {
    let chat = chat::find_by_id(db, chat_id).await?;

    if !chat.is_participant(requesting_user_id) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Forbidden,
        });
    }

    if requested == ExchangeStatus::Completed {
        // Not requestable: completion only ever derives from dual confirmation.
        let current = exchange::find_by_chat_id(db, chat_id).await?.status;
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::InvalidTransition {
                from: current,
                requested,
            },
        });
    }

    let txn = db.begin().await.map_err(txn_error)?;

    let existing = exchange::find_by_chat_id_for_update(&txn, chat_id).await?;

    if !allowed_successors(existing.status).contains(&requested) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::InvalidTransition {
                from: existing.status,
                requested,
            },
        });
    }

    let updated = exchange::update_status(&txn, existing, requested).await?;

    txn.commit().await.map_err(txn_error)?;

    info!("Exchange for chat {chat_id} transitioned to {requested}");

    event_publisher
        .publish(DomainEvent::ExchangeTransitioned {
            chat_id,
            status: updated.status.to_string(),
            notify_user_ids: chat.participants().to_vec(),
        })
        .await;

    Ok(updated.status)
}

/// Records `confirming_user_id`'s completion vote.
///
/// The flag write and the derived status land in one UPDATE under a row
/// lock, so two "simultaneous" confirmations cannot lose an update and
/// completion is observed exactly once. Re-confirming an already-confirmed
/// side is a no-op.
pub async fn confirm(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    chat_id: crate::Id,
    confirming_user_id: crate::Id,
) -> Result<Model, Error> {
    let chat = chat::find_by_id(db, chat_id).await?;

    if !chat.is_participant(confirming_user_id) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Forbidden,
        });
    }

    let confirming_as_offerer = chat.offerer_id == confirming_user_id;

    let txn = db.begin().await.map_err(txn_error)?;

    let existing = exchange::find_by_chat_id_for_update(&txn, chat_id).await?;

    let already_confirmed = if confirming_as_offerer {
        existing.offerer_confirmed
    } else {
        existing.interested_confirmed
    };

    if already_confirmed {
        // Idempotent: the vote is already recorded, whatever the status is now.
        txn.commit().await.map_err(txn_error)?;
        return Ok(existing);
    }

    if existing.status.is_terminal() {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::InvalidTransition {
                from: existing.status,
                requested: ExchangeStatus::Completed,
            },
        });
    }

    let offerer_confirmed = existing.offerer_confirmed || confirming_as_offerer;
    let interested_confirmed = existing.interested_confirmed || !confirming_as_offerer;
    let status = resolved_status(offerer_confirmed, interested_confirmed);

    let updated = exchange::update_confirmations(
        &txn,
        existing,
        offerer_confirmed,
        interested_confirmed,
        status,
    )
    .await?;

    txn.commit().await.map_err(txn_error)?;

    info!(
        "Exchange for chat {chat_id} confirmed by {} side; status now {status}",
        if confirming_as_offerer {
            "offerer"
        } else {
            "interested"
        }
    );

    event_publisher
        .publish(DomainEvent::ExchangeTransitioned {
            chat_id,
            status: updated.status.to_string(),
            notify_user_ids: chat.participants().to_vec(),
        })
        .await;

    Ok(updated)
}

/// Cancels the chat's exchange; legal from `pending` or `accepted`.
pub async fn cancel(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    chat_id: crate::Id,
    cancelling_user_id: crate::Id,
) -> Result<ExchangeStatus, Error> {
    request_transition(
        db,
        event_publisher,
        chat_id,
        ExchangeStatus::Cancelled,
        cancelling_user_id,
    )
    .await
}

/// The chat's current exchange status; `NotFound` when no exchange exists.
pub async fn get_status(
    db: &DatabaseConnection,
    chat_id: crate::Id,
) -> Result<ExchangeStatus, Error> {
    Ok(exchange::find_by_chat_id(db, chat_id).await?.status)
}

/// Defensive read for callers that only need "is this chat still live":
/// a chat with no exchange row reads as cancelled instead of erroring.
pub async fn status_or_cancelled(
    db: &DatabaseConnection,
    chat_id: crate::Id,
) -> Result<ExchangeStatus, Error> {
    match exchange::find_by_chat_id(db, chat_id).await {
        Ok(exchange) => Ok(exchange.status),
        Err(err)
            if err.error_kind == entity_api::error::EntityApiErrorKind::RecordNotFound =>
        {
            warn!("Chat {chat_id} has no exchange row; treating it as cancelled");
            Ok(ExchangeStatus::Cancelled)
        }
        Err(err) => Err(err.into()),
    }
}

/// Whether `user_id`'s own confirmation vote is recorded. Used by the
/// per-chat message snapshot, which reports the caller's flag.
pub async fn has_user_confirmed(
    db: &DatabaseConnection,
    chat_id: crate::Id,
    user_id: crate::Id,
) -> Result<bool, Error> {
    let chat = chat::find_by_id(db, chat_id).await?;

    if !chat.is_participant(user_id) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Forbidden,
        });
    }

    let exchange = exchange::find_by_chat_id(db, chat_id).await?;

    Ok(if chat.offerer_id == user_id {
        exchange.offerer_confirmed
    } else {
        exchange.interested_confirmed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_table_matches_the_lifecycle() {
        assert_eq!(
            allowed_successors(ExchangeStatus::Pending),
            &[ExchangeStatus::Accepted, ExchangeStatus::Cancelled]
        );
        assert_eq!(
            allowed_successors(ExchangeStatus::Accepted),
            &[ExchangeStatus::Completed, ExchangeStatus::Cancelled]
        );
        assert!(allowed_successors(ExchangeStatus::Completed).is_empty());
        assert!(allowed_successors(ExchangeStatus::Cancelled).is_empty());
    }

    #[test]
    fn every_disallowed_pair_is_rejected_by_the_table() {
        use ExchangeStatus::*;

        let all = [Pending, Accepted, Completed, Cancelled];
        for current in all {
            for requested in all {
                let allowed = allowed_successors(current).contains(&requested);
                let expected = matches!(
                    (current, requested),
                    (Pending, Accepted)
                        | (Pending, Cancelled)
                        | (Accepted, Completed)
                        | (Accepted, Cancelled)
                );
                assert_eq!(allowed, expected, "({current}, {requested})");
            }
        }
    }

    #[test]
    fn completion_requires_both_votes() {
        assert_eq!(resolved_status(false, false), ExchangeStatus::Accepted);
        assert_eq!(resolved_status(true, false), ExchangeStatus::Accepted);
        assert_eq!(resolved_status(false, true), ExchangeStatus::Accepted);
        assert_eq!(resolved_status(true, true), ExchangeStatus::Completed);
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod mock_tests {
    use super::*;
    use entity::{chats, exchanges};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn chat_model() -> chats::Model {
        chats::Model {
            id: crate::Id::new_v4(),
            offerer_id: crate::Id::new_v4(),
            interested_id: crate::Id::new_v4(),
            book_id: crate::Id::new_v4(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn exchange_model(chat: &chats::Model, status: ExchangeStatus) -> exchanges::Model {
        let now = chrono::Utc::now();
        exchanges::Model {
            id: crate::Id::new_v4(),
            chat_id: chat.id,
            status,
            offerer_confirmed: false,
            interested_confirmed: false,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn request_transition_rejects_non_participants() {
        let chat = chat_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .into_connection();

        let result = request_transition(
            &db,
            &EventPublisher::default(),
            chat.id,
            ExchangeStatus::Accepted,
            crate::Id::new_v4(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Forbidden
        );
    }

    #[tokio::test]
    async fn request_transition_rejects_direct_completion() {
        let chat = chat_model();
        let exchange = exchange_model(&chat, ExchangeStatus::Accepted);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![exchange]])
            .into_connection();

        let result = request_transition(
            &db,
            &EventPublisher::default(),
            chat.id,
            ExchangeStatus::Completed,
            chat.offerer_id,
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::InvalidTransition {
                from: ExchangeStatus::Accepted,
                requested: ExchangeStatus::Completed,
            }
        );
    }

    #[tokio::test]
    async fn request_transition_rejects_leaving_a_terminal_state() {
        let chat = chat_model();
        let exchange = exchange_model(&chat, ExchangeStatus::Cancelled);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![exchange]])
            .into_connection();

        let result = request_transition(
            &db,
            &EventPublisher::default(),
            chat.id,
            ExchangeStatus::Accepted,
            chat.interested_id,
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::InvalidTransition {
                from: ExchangeStatus::Cancelled,
                requested: ExchangeStatus::Accepted,
            }
        );
    }

    #[tokio::test]
    async fn confirm_from_one_side_keeps_the_exchange_accepted() {
        let chat = chat_model();
        let exchange = exchange_model(&chat, ExchangeStatus::Accepted);
        let confirmed = exchanges::Model {
            offerer_confirmed: true,
            ..exchange.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![exchange]])
            .append_query_results(vec![vec![confirmed.clone()]])
            .into_connection();

        let result = confirm(&db, &EventPublisher::default(), chat.id, chat.offerer_id)
            .await
            .expect("confirm should succeed");

        assert_eq!(result.status, ExchangeStatus::Accepted);
        assert!(result.offerer_confirmed);
        assert!(!result.interested_confirmed);
    }

    #[tokio::test]
    async fn confirm_from_the_second_side_completes_the_exchange() {
        let chat = chat_model();
        let one_side_in = exchanges::Model {
            offerer_confirmed: true,
            ..exchange_model(&chat, ExchangeStatus::Accepted)
        };
        let completed = exchanges::Model {
            interested_confirmed: true,
            status: ExchangeStatus::Completed,
            ..one_side_in.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![one_side_in]])
            .append_query_results(vec![vec![completed.clone()]])
            .into_connection();

        let result = confirm(&db, &EventPublisher::default(), chat.id, chat.interested_id)
            .await
            .expect("confirm should succeed");

        assert_eq!(result.status, ExchangeStatus::Completed);
        assert!(result.offerer_confirmed);
        assert!(result.interested_confirmed);
    }

    #[tokio::test]
    async fn reconfirming_the_same_side_is_a_noop() {
        let chat = chat_model();
        let already_in = exchanges::Model {
            offerer_confirmed: true,
            ..exchange_model(&chat, ExchangeStatus::Accepted)
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![already_in.clone()]])
            .into_connection();

        let result = confirm(&db, &EventPublisher::default(), chat.id, chat.offerer_id)
            .await
            .expect("re-confirm should be a no-op");

        assert_eq!(result.status, ExchangeStatus::Accepted);
        assert!(result.offerer_confirmed);
    }

    #[tokio::test]
    async fn confirming_a_cancelled_exchange_is_rejected() {
        let chat = chat_model();
        let cancelled = exchange_model(&chat, ExchangeStatus::Cancelled);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![cancelled]])
            .into_connection();

        let result = confirm(&db, &EventPublisher::default(), chat.id, chat.offerer_id).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::InvalidTransition {
                from: ExchangeStatus::Cancelled,
                requested: ExchangeStatus::Completed,
            }
        );
    }

    #[tokio::test]
    async fn status_or_cancelled_masks_a_missing_exchange() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<exchanges::Model>::new()])
            .into_connection();

        let status = status_or_cancelled(&db, crate::Id::new_v4())
            .await
            .expect("missing exchange should read as cancelled");

        assert_eq!(status, ExchangeStatus::Cancelled);
    }
}
