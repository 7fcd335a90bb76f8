use domain::Id;
use serde::Deserialize;
use utoipa::ToSchema;

/// Body of POST /chats: open (or rejoin) a conversation about a listing.
/// The caller is the interested party; the listing's owner is derived
/// server-side.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateParams {
    pub book_id: Id,
}
