use sea_orm_migration::prelude::*;

mod m20250801_initial;
mod m20250806_event_log_string_refs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_initial::Migration),
            Box::new(m20250806_event_log_string_refs::Migration),
        ]
    }
}
