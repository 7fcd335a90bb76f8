use chrono::Utc;
use log::info;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{books, chats, exchange_status, exchanges, messages, users, Id};

pub mod book;
pub mod chat;
pub mod error;
pub mod exchange;
pub mod message;
pub mod user;

/// Seeds a handful of users and listings so the chat endpoints have
/// something to talk about in a development environment.
pub async fn seed_database(db: &DatabaseConnection) {
    let now = Utc::now();

    let alice = users::ActiveModel {
        id: Set(Id::new_v4()),
        name: Set("Alice Marlow".to_owned()),
        email: Set("alice@bookswap.dev".to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    let bruno = users::ActiveModel {
        id: Set(Id::new_v4()),
        name: Set("Bruno Keller".to_owned()),
        email: Set("bruno@bookswap.dev".to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    let dune = books::ActiveModel {
        id: Set(Id::new_v4()),
        owner_id: Set(alice.id),
        title: Set("Dune".to_owned()),
        image_url: Set(Some("https://covers.bookswap.dev/dune.jpg".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    let solaris = books::ActiveModel {
        id: Set(Id::new_v4()),
        owner_id: Set(bruno.id),
        title: Set("Solaris".to_owned()),
        image_url: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();

    info!(
        "Seeded users {} and {} with listings {} and {}",
        alice.id, bruno.id, dune.id, solaris.id
    );
}
