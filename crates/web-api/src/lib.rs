//! Web layer: axum routes delegating to the application services, plus the
//! WebSocket endpoint that feeds socket events into the chat service.

mod auth;
mod error;
mod routes;
mod state;
mod websocket;

pub use auth::{JwtService, LoginResponse};
pub use routes::router;
pub use state::AppState;
