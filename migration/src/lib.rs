pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20241001_000001_initial_tables;
mod m20241115_000001_devices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_initial_tables::Migration),
            Box::new(m20241115_000001_devices::Migration),
        ]
    }
}
