//! Application layer: the real-time coordination core and the use-case
//! services built on top of it.
//!
//! The coordination core is a set of in-memory structures owned by a single
//! process: the [`registry::ConnectionRegistry`] (live sessions), the
//! [`typing::TypingTracker`] (ephemeral typing state), the
//! [`delivery::EventSinkRegistry`] (per-connection outbound channels) and the
//! [`presence::Presence`] projection. [`services::ChatService`] drives them
//! from inbound socket events; persistence goes through the repository
//! traits in [`repository`].

pub mod auth;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod password;
pub mod presence;
pub mod registry;
pub mod repository;
pub mod services;
pub mod typing;

pub use auth::TokenVerifier;
pub use clock::{Clock, SystemClock};
pub use delivery::EventSinkRegistry;
pub use error::{ApplicationError, ApplicationResult};
pub use password::{BcryptPasswordHasher, PasswordHasher};
pub use presence::Presence;
pub use registry::ConnectionRegistry;
pub use repository::{
    BulkDeleteFilter, MessageFilter, MessagePage, MessageRepository, RepositoryError,
    RoomRepository, UserRepository,
};
pub use services::{
    AdminService, AdminServiceDependencies, AdminUserView, AuthenticateRequest, ChatService,
    ChatServiceDependencies, RegisterRequest, RoomSummary, UpdateUserRequest, UserService,
    UserServiceDependencies,
};
pub use typing::TypingTracker;
