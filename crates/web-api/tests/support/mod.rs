//! Spins up the full router on an ephemeral port, backed by in-memory
//! repositories so the tests need no database.

use std::sync::Arc;

use tokio::net::TcpListener;

use application::{
    AdminService, AdminServiceDependencies, BcryptPasswordHasher, ChatService,
    ChatServiceDependencies, ConnectionRegistry, EventSinkRegistry, Presence, SystemClock,
    TypingTracker, UserService, UserServiceDependencies,
};
use config::JwtConfig;
use infrastructure::{InMemoryMessageRepository, InMemoryRoomRepository, InMemoryUserRepository};
use web_api::{router, AppState, JwtService};

pub const ADMIN_CODE: &str = "letmein";

/// Starts the app and returns its `host:port`.
pub async fn spawn_app() -> String {
    let users = Arc::new(InMemoryUserRepository::new());
    let rooms = Arc::new(InMemoryRoomRepository::new());
    let messages = Arc::new(InMemoryMessageRepository::new());

    let registry = Arc::new(ConnectionRegistry::new());
    let typing = Arc::new(TypingTracker::new());
    let sinks = Arc::new(EventSinkRegistry::new());
    let presence = Arc::new(Presence::new(registry.clone(), sinks.clone()));
    let clock = Arc::new(SystemClock);

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret".to_string(),
        expiration_hours: 1,
    }));

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        user_repository: users.clone(),
        room_repository: rooms.clone(),
        message_repository: messages.clone(),
        token_verifier: jwt_service.clone(),
        clock: clock.clone(),
        registry: registry.clone(),
        typing,
        sinks: sinks.clone(),
        presence: presence.clone(),
    }));

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: users.clone(),
        // Minimum cost keeps the tests fast.
        password_hasher: Arc::new(BcryptPasswordHasher::new(4)),
        clock,
        admin_code: ADMIN_CODE.to_string(),
    }));

    let admin_service = Arc::new(AdminService::new(AdminServiceDependencies {
        user_repository: users,
        room_repository: rooms,
        message_repository: messages,
        registry,
        sinks,
        presence,
    }));

    let state = AppState::new(user_service, chat_service, admin_service, jwt_service);
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });

    format!("{addr}")
}
