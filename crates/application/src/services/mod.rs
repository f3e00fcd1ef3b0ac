mod admin_service;
mod chat_service;
mod user_service;

pub use admin_service::{AdminService, AdminServiceDependencies, AdminUserView, UpdateUserRequest};
pub use chat_service::{ChatService, ChatServiceDependencies, RoomSummary};
pub use user_service::{AuthenticateRequest, RegisterRequest, UserService, UserServiceDependencies};
