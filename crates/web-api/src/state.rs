use std::sync::Arc;

use application::{AdminService, ChatService, UserService};

use crate::auth::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub chat_service: Arc<ChatService>,
    pub admin_service: Arc<AdminService>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        chat_service: Arc<ChatService>,
        admin_service: Arc<AdminService>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            chat_service,
            admin_service,
            jwt_service,
        }
    }
}
