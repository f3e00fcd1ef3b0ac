//! Server entry point: wires the PostgreSQL repositories, the coordination
//! core and the web layer, then serves HTTP and WebSocket traffic.

mod seed;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use application::{
    AdminService, AdminServiceDependencies, BcryptPasswordHasher, ChatService,
    ChatServiceDependencies, Clock, ConnectionRegistry, EventSinkRegistry, MessageRepository,
    PasswordHasher, Presence, RoomRepository, SystemClock, TypingTracker, UserRepository,
    UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{create_pool, PgMessageRepository, PgRoomRepository, PgUserRepository};
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();

    let pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to the database")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PgUserRepository::new(pool.clone()));
    let room_repository: Arc<dyn RoomRepository> =
        Arc::new(PgRoomRepository::new(pool.clone()));
    let message_repository: Arc<dyn MessageRepository> =
        Arc::new(PgMessageRepository::new(pool));

    let registry = Arc::new(ConnectionRegistry::new());
    let typing = Arc::new(TypingTracker::new());
    let sinks = Arc::new(EventSinkRegistry::new());
    let presence = Arc::new(Presence::new(registry.clone(), sinks.clone()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(
        config.server.bcrypt_cost.unwrap_or(bcrypt::DEFAULT_COST),
    ));
    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
        admin_code: config.seed.admin_code.clone(),
    }));

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        user_repository: user_repository.clone(),
        room_repository: room_repository.clone(),
        message_repository: message_repository.clone(),
        token_verifier: jwt_service.clone(),
        clock: clock.clone(),
        registry: registry.clone(),
        typing,
        sinks: sinks.clone(),
        presence: presence.clone(),
    }));

    let admin_service = Arc::new(AdminService::new(AdminServiceDependencies {
        user_repository: user_repository.clone(),
        room_repository: room_repository.clone(),
        message_repository,
        registry,
        sinks,
        presence,
    }));

    seed::run(
        &config.seed,
        &user_service,
        &user_repository,
        &room_repository,
        &clock,
    )
    .await
    .context("startup seeding failed")?;

    let state = AppState::new(user_service, chat_service, admin_service, jwt_service);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "chat server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
