//! Real-time push infrastructure for the bookswap platform.
//!
//! This crate keeps every live WebSocket channel reachable and keeps all of
//! them consistent with the authoritative state after each mutation.
//!
//! # Architecture
//!
//! - **Many channels per user**: a user may hold any number of concurrent
//!   connections (multi-device); each registers independently.
//! - **Dual-index registry**: O(1) lookups for both connection management
//!   and user-scoped routing via separate DashMap indices; buckets shard by
//!   key, so unrelated users never contend on one lock.
//! - **Channel kinds**: a connection watches either the user's chat
//!   directory or one chat's message view; payloads are routed only to the
//!   matching kind.
//! - **Ephemeral delivery**: if a user is offline the push is dropped; the
//!   client receives a full snapshot on its next connect.
//! - **No cached views**: the fan-out handler recomputes every pushed view
//!   from the message log and exchange state, per recipient, so a pushed
//!   view and a pulled one can never diverge.
//!
//! # Message flow
//!
//! 1. A client opens `/ws/chats` or `/ws/chats/:chat_id/messages`
//! 2. The web layer authenticates the bearer token and registers the
//!    connection with its kind
//! 3. A mutation (message, confirmation, cancellation, chat creation)
//!    commits and the domain layer publishes a [`events::DomainEvent`]
//! 4. [`fanout::FanoutHandler`] recomputes each participant's views and
//!    hands them to [`Manager::send_message`]
//! 5. The manager serializes once and delivers to every matching live
//!    channel; dead channels are unregistered as a cleanup side effect
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture, channel
//!   kinds, and type-safe ConnectionId
//! - `manager`: scope-based routing (delegates to ConnectionRegistry)
//! - `message`: wire payload and scope definitions
//! - `fanout`: the domain-event handler that recomputes and pushes views

pub mod connection;
pub mod fanout;
pub mod manager;
pub mod message;

pub use manager::Manager;
