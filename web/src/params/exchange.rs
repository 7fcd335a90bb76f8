use domain::exchange_status::ExchangeStatus;
use serde::Deserialize;
use utoipa::ToSchema;

/// Body of PUT /chats/:id/exchange: the requested lifecycle status.
/// Requesting `completed` is always rejected — completion derives from
/// both sides confirming.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionParams {
    pub status: ExchangeStatus,
}
