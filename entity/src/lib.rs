use uuid::Uuid;

pub mod prelude;

// Core entities
pub mod books;
pub mod chats;
pub mod exchange_status;
pub mod exchanges;
pub mod messages;
pub mod users;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
/// Note: `messages` is the one exception — its id is a server-assigned
/// monotonically increasing `i64` used as the ordering tie-break.
pub type Id = Uuid;
