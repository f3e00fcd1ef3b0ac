//! Core domain model for the chat server.
//!
//! Entities (users, rooms, messages), ephemeral session state and the
//! server-to-client event vocabulary live here. No I/O.

pub mod errors;
pub mod events;
pub mod message;
pub mod room;
pub mod session;
pub mod user;
pub mod value_objects;

pub use errors::*;
pub use events::*;
pub use message::*;
pub use room::*;
pub use session::*;
pub use user::*;
pub use value_objects::*;
