//! Floor-management ledger: seating regions and their tables, one open
//! session ("tab") per table, line-item reconciliation and the
//! open → paid/canceled lifecycle. Transports wrap this crate; none live here.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use std::env;
use tracing::info;

pub mod catalog;
pub mod directory;
pub mod error;
pub mod models;
pub mod orders;
pub mod schema;
pub mod sessions;
pub mod views;

pub use error::LedgerError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Handle to the ledger database. Owns a single connection; every operation
/// takes `&mut`, so callers of one store serialize at compile time, and the
/// connection is released when the store is dropped.
pub struct Store {
    conn: SqliteConnection,
}

impl Store {
    /// Open (creating if necessary) the database at `database_url`, enable
    /// foreign key enforcement and run pending migrations.
    pub fn open(database_url: &str) -> Result<Self, LedgerError> {
        let mut conn = SqliteConnection::establish(database_url)?;
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| LedgerError::Migration(e.to_string()))?;
        info!(database_url, "ledger store opened");
        Ok(Store { conn })
    }

    /// Open the database named by `DATABASE_URL` (a `.env` file is honored).
    pub fn from_env() -> Result<Self, LedgerError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| LedgerError::Config("DATABASE_URL must be set".into()))?;
        Self::open(&database_url)
    }

    /// Private in-memory database, used by the test suite.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::open(":memory:")
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}
