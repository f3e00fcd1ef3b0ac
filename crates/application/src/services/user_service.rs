use std::sync::Arc;

use domain::{Permissions, Timestamp, User, UserId, UserRole};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ApplicationError, ApplicationResult};
use crate::password::PasswordHasher;
use crate::repository::UserRepository;

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Secret code that grants the admin role at registration time.
    pub admin_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthenticateRequest {
    /// Email, or a bare username for convenience logins.
    pub email: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    /// Configured admin registration code.
    pub admin_code: String,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterRequest) -> ApplicationResult<User> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(ApplicationError::validation("username is required"));
        }
        if request.password.is_empty() {
            return Err(ApplicationError::validation("password is required"));
        }

        let email = request.email.trim().to_lowercase();
        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
            || self
                .deps
                .user_repository
                .find_by_username(&username)
                .await?
                .is_some()
        {
            return Err(ApplicationError::validation(
                "User with this email or username already exists",
            ));
        }

        let is_admin = request
            .admin_code
            .is_some_and(|code| code == self.deps.admin_code);
        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let user = User {
            id: UserId::new(Uuid::new_v4()),
            username,
            email,
            password_hash,
            role: if is_admin {
                UserRole::Admin
            } else {
                UserRole::User
            },
            permissions: if is_admin {
                Permissions::all()
            } else {
                Permissions::default()
            },
            avatar: None,
            is_online: false,
            last_seen: None,
            created_at: self.deps.clock.now(),
        };

        Ok(self.deps.user_repository.create(user).await?)
    }

    /// Logs in by email, or by username when the identifier has no '@'.
    pub async fn authenticate(&self, request: AuthenticateRequest) -> ApplicationResult<User> {
        let identifier = request.email.trim();
        let user = if identifier.contains('@') {
            self.deps
                .user_repository
                .find_by_email(&identifier.to_lowercase())
                .await?
        } else {
            self.deps
                .user_repository
                .find_by_username(identifier)
                .await?
        };

        let user =
            user.ok_or_else(|| ApplicationError::authentication("Invalid credentials"))?;
        let valid = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !valid {
            return Err(ApplicationError::authentication("Invalid credentials"));
        }
        Ok(user)
    }

    pub async fn get_profile(&self, id: UserId) -> ApplicationResult<User> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("User not found"))
    }

    pub async fn list_users(&self) -> ApplicationResult<Vec<User>> {
        Ok(self.deps.user_repository.list().await?)
    }

    pub fn now(&self) -> Timestamp {
        self.deps.clock.now()
    }
}
