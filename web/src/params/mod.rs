pub(crate) mod chat;
pub(crate) mod exchange;
pub(crate) mod message;
