pub use sea_orm_migration::prelude::*;

mod m20250612_000001_create_users;
mod m20250612_000002_create_garages;
mod m20250612_000003_create_bookings;
mod m20250612_000004_create_reviews;
mod m20250612_000005_create_addresses;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250612_000001_create_users::Migration),
            Box::new(m20250612_000002_create_garages::Migration),
            Box::new(m20250612_000003_create_bookings::Migration),
            Box::new(m20250612_000004_create_reviews::Migration),
            Box::new(m20250612_000005_create_addresses::Migration),
        ]
    }
}
