mod message_repository_impl;
mod room_repository_impl;
mod user_repository_impl;

pub use message_repository_impl::PgMessageRepository;
pub use room_repository_impl::PgRoomRepository;
pub use user_repository_impl::PgUserRepository;

use application::RepositoryError;
use tracing::error;

/// Maps driver errors onto the repository error taxonomy. Unique-constraint
/// hits surface as conflicts so services can turn them into validation
/// failures; anything else is logged here since services only see the
/// flattened message.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::not_found("row"),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::conflict("record already exists")
        }
        _ => {
            error!(%err, "database query failed");
            RepositoryError::database(err.to_string())
        }
    }
}
