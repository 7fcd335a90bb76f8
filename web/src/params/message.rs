use serde::Deserialize;
use utoipa::ToSchema;

/// Body of POST /chats/:id/messages. Only the content is client-supplied;
/// id and timestamp are assigned by the server.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendParams {
    pub content: String,
}
