//! The business core of the bookswap platform: the exchange state machine,
//! the append-only message log, the per-user chat directory, and the
//! identity-collaborator adapter.
//!
//! This module re-exports various items from the `entity_api` crate so that
//! consumers of the `domain` crate do not need to directly depend on it.

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{books, chats, exchange_status, exchanges, messages, users, Id};

pub mod chat;
pub mod error;
pub mod exchange;
pub mod identity;
pub mod message;

// Re-export so the binary crates can wire handlers without a direct
// dependency on the events crate.
pub use events;
