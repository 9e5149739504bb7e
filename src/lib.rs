mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod media;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
mod constants;
pub mod fixtures;
pub mod routes;

pub use authentication::*;
pub use constants::*;
pub use database::*;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
