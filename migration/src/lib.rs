pub use sea_orm_migration::prelude::*;

mod m20250301_101500_create_schema_and_base_db_setup;
mod m20250322_090000_add_message_ordering_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_101500_create_schema_and_base_db_setup::Migration),
            Box::new(m20250322_090000_add_message_ordering_index::Migration),
        ]
    }
}
