//! Shared harness for service-level tests: in-memory repositories wired
//! into the real coordination stack, with a channel pair standing in for
//! each socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use application::{
    ApplicationError, BulkDeleteFilter, ChatService, ChatServiceDependencies,
    ConnectionRegistry, EventSinkRegistry, MessageFilter, MessagePage, MessageRepository,
    Presence, RepositoryError, SystemClock, TokenVerifier, TypingTracker,
};
use domain::{
    ClientEvent, ConnectionId, Message, MessageId, Permissions, ServerEvent, User, UserId,
    UserRole,
};
use infrastructure::{InMemoryMessageRepository, InMemoryRoomRepository, InMemoryUserRepository};

/// Token lookup table; tests mint tokens by registering them here.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    pub fn with_token(token: &str, user_id: UserId) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), user_id);
        Self { tokens }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<UserId, ApplicationError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| ApplicationError::authentication("Authentication failed"))
    }
}

pub struct Harness {
    pub chat: ChatService,
    pub registry: Arc<ConnectionRegistry>,
    pub typing: Arc<TypingTracker>,
    pub sinks: Arc<EventSinkRegistry>,
    pub users: Arc<InMemoryUserRepository>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub messages: Arc<InMemoryMessageRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_verifier(StaticTokenVerifier::default())
    }

    pub fn with_verifier(verifier: StaticTokenVerifier) -> Self {
        let messages = Arc::new(InMemoryMessageRepository::new());
        Self::assemble(verifier, messages.clone(), messages)
    }

    /// Harness whose message store can be told to fail, for exercising the
    /// persistence-failure paths.
    pub fn with_failing_messages() -> (Self, Arc<FailingMessageRepository>) {
        let inner = Arc::new(InMemoryMessageRepository::new());
        let failing = Arc::new(FailingMessageRepository::new(inner.clone()));
        let harness =
            Self::assemble(StaticTokenVerifier::default(), inner, failing.clone());
        (harness, failing)
    }

    fn assemble(
        verifier: StaticTokenVerifier,
        messages: Arc<InMemoryMessageRepository>,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let typing = Arc::new(TypingTracker::new());
        let sinks = Arc::new(EventSinkRegistry::new());
        let presence = Arc::new(Presence::new(registry.clone(), sinks.clone()));

        let chat = ChatService::new(ChatServiceDependencies {
            user_repository: users.clone(),
            room_repository: rooms.clone(),
            message_repository,
            token_verifier: Arc::new(verifier),
            clock: Arc::new(SystemClock),
            registry: registry.clone(),
            typing: typing.clone(),
            sinks: sinks.clone(),
            presence,
        });

        Self {
            chat,
            registry,
            typing,
            sinks,
            users,
            rooms,
            messages,
        }
    }

    /// Opens a fresh "socket": registers an outbound sink and hands back
    /// the receiving end.
    pub async fn connect(&self) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.chat.attach(connection_id, tx).await;
        (connection_id, rx)
    }

    /// Connects and completes the identify handshake as a guest.
    pub async fn join_guest(
        &self,
        name: &str,
        room: &str,
    ) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (connection_id, rx) = self.connect().await;
        self.chat
            .handle(
                connection_id,
                ClientEvent::UserJoin {
                    token: None,
                    username: Some(name.to_string()),
                    room: Some(room.to_string()),
                },
            )
            .await;
        (connection_id, rx)
    }

    /// Stores a registered user directly, bypassing the password flow.
    pub async fn seed_user(&self, username: &str) -> User {
        self.seed_user_as(UserId::new(uuid::Uuid::new_v4()), username)
            .await
    }

    /// Variant with a caller-chosen id, for tests that mint a token for the
    /// user before the harness exists.
    pub async fn seed_user_as(&self, id: UserId, username: &str) -> User {
        let user = User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "x".to_string(),
            role: UserRole::User,
            permissions: Permissions::default(),
            avatar: None,
            is_online: false,
            last_seen: None,
            created_at: chrono::Utc::now(),
        };
        use application::UserRepository;
        self.users.create(user.clone()).await.unwrap();
        user
    }
}

/// Message store wrapper whose writes or reads can be switched to fail,
/// standing in for a database outage.
pub struct FailingMessageRepository {
    inner: Arc<InMemoryMessageRepository>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FailingMessageRepository {
    pub fn new(inner: Arc<InMemoryMessageRepository>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    fn outage() -> RepositoryError {
        RepositoryError::database("connection reset")
    }
}

#[async_trait]
impl MessageRepository for FailingMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.create(message).await
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.update(message).await
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn list_recent_public(
        &self,
        room: &str,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.list_recent_public(room, limit).await
    }

    async fn list_public_page(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.inner.list_public_page(room, page, limit).await
    }

    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.inner.list_private_between(a, b).await
    }

    async fn search(&self, filter: MessageFilter) -> Result<MessagePage, RepositoryError> {
        self.inner.search(filter).await
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }

    async fn bulk_delete(
        &self,
        filter: BulkDeleteFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.inner.bulk_delete(filter).await
    }

    async fn delete_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        self.inner.delete_by_sender(sender).await
    }

    async fn delete_by_room(&self, room: &str) -> Result<u64, RepositoryError> {
        self.inner.delete_by_room(room).await
    }

    async fn count_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        self.inner.count_by_sender(sender).await
    }

    async fn count_public_in_room(&self, room: &str) -> Result<u64, RepositoryError> {
        self.inner.count_public_in_room(room).await
    }
}

/// Pulls everything currently buffered on a receiver.
pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
