use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status of an exchange through its lifecycle.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Default,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "exchange_status")]
pub enum ExchangeStatus {
    /// Conversation opened, the offerer has not yet agreed to trade
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Both parties are negotiating the hand-off
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Both sides confirmed; terminal
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Called off by either side; terminal
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ExchangeStatus {
    /// A chat accepts new messages only while its exchange is in one of
    /// these states.
    pub fn is_active(&self) -> bool {
        matches!(self, ExchangeStatus::Pending | ExchangeStatus::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeStatus::Pending => write!(fmt, "pending"),
            ExchangeStatus::Accepted => write!(fmt, "accepted"),
            ExchangeStatus::Completed => write!(fmt, "completed"),
            ExchangeStatus::Cancelled => write!(fmt, "cancelled"),
        }
    }
}
