//! Persistence adapters.
//!
//! PostgreSQL implementations of the application repository traits, plus
//! in-memory variants used by service-level and end-to-end tests that run
//! without a database.

pub mod db;
pub mod memory;

pub use db::repositories::{PgMessageRepository, PgRoomRepository, PgUserRepository};
pub use db::{create_pool, DbPool};
pub use memory::{InMemoryMessageRepository, InMemoryRoomRepository, InMemoryUserRepository};
