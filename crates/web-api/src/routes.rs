use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    AdminUserView, AuthenticateRequest, BulkDeleteFilter, MessageFilter, RegisterRequest,
    RoomSummary, UpdateUserRequest,
};
use domain::{Message, MessageId, Permissions, Room, Timestamp, User, UserId};

use crate::auth::LoginResponse;
use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket;

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
    admin_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    name: String,
    description: Option<String>,
    is_private: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AdminMessagesQuery {
    room: Option<String>,
    search: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BulkDeletePayload {
    ids: Option<Vec<Uuid>>,
    room: Option<String>,
    from: Option<Timestamp>,
    to: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
struct BulkDeleteResponse {
    deleted: u64,
}

#[derive(Debug, Serialize)]
struct MessagePageResponse {
    messages: Vec<Message>,
    total: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .route("/ws", get(websocket::websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/users", get(list_users))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/messages/{room}", get(room_history))
        .route("/messages/private/{user_id}", get(private_conversation))
        .route("/admin/users", get(admin_list_users))
        .route(
            "/admin/users/{user_id}",
            put(admin_update_user).delete(admin_delete_user),
        )
        .route("/admin/messages", get(admin_list_messages))
        .route("/admin/messages/bulk-delete", post(admin_bulk_delete))
        .route("/admin/messages/{message_id}", delete(admin_delete_message))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user_id = state.jwt_service.user_from_headers(headers)?;
    Ok(state.user_service.get_profile(user_id).await?)
}

async fn require_permission(
    state: &AppState,
    headers: &HeaderMap,
    check: impl Fn(&Permissions) -> bool,
) -> Result<User, ApiError> {
    let user = current_user(state, headers).await?;
    if !user.has_permission(check) {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }
    Ok(user)
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            admin_code: payload.admin_code,
        })
        .await?;
    let token = state.jwt_service.generate_token(user.id)?;
    Ok((StatusCode::CREATED, Json(LoginResponse { user, token })))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;
    let token = state.jwt_service.generate_token(user.id)?;
    Ok(Json(LoginResponse { user, token }))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    Ok(Json(current_user(&state, &headers).await?))
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiError> {
    current_user(&state, &headers).await?;
    Ok(Json(state.user_service.list_users().await?))
}

async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    Ok(Json(state.chat_service.list_rooms().await?))
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let user = current_user(&state, &headers).await?;
    let room = state
        .chat_service
        .create_room_record(
            Some(user.id),
            payload.name,
            payload.description,
            payload.is_private.unwrap_or(false),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn room_history(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).min(100);
    Ok(Json(state.chat_service.room_history(&room, page, limit).await?))
}

async fn private_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let caller = current_user(&state, &headers).await?;
    let other = UserId::new(user_id);
    Ok(Json(
        state
            .chat_service
            .private_conversation(caller.id, other)
            .await?,
    ))
}

// ---- admin surface ----

async fn admin_list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminUserView>>, ApiError> {
    require_permission(&state, &headers, |p| p.can_view_all_users).await?;
    Ok(Json(state.admin_service.list_users().await?))
}

async fn admin_update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let caller = current_user(&state, &headers).await?;
    // Role and permission edits are reserved for full admins.
    if !caller.is_admin() {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }
    Ok(Json(
        state
            .admin_service
            .update_user(UserId::new(user_id), request)
            .await?,
    ))
}

async fn admin_delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_permission(&state, &headers, |p| p.can_delete_users).await?;
    state.admin_service.delete_user(UserId::new(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminMessagesQuery>,
) -> Result<Json<MessagePageResponse>, ApiError> {
    require_permission(&state, &headers, |p| p.can_delete_messages).await?;
    let page = state
        .admin_service
        .list_messages(MessageFilter {
            room: query.room,
            search: query.search,
            page: query.page.unwrap_or(1).max(1),
            limit: query.limit.unwrap_or(50).min(100),
        })
        .await?;
    Ok(Json(MessagePageResponse {
        messages: page.messages,
        total: page.total,
    }))
}

async fn admin_delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_permission(&state, &headers, |p| p.can_delete_messages).await?;
    state
        .admin_service
        .delete_message(MessageId::new(message_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_bulk_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    require_permission(&state, &headers, |p| p.can_delete_messages).await?;
    let filter = BulkDeleteFilter {
        ids: payload
            .ids
            .unwrap_or_default()
            .into_iter()
            .map(MessageId::new)
            .collect(),
        room: payload.room,
        range: payload.from.zip(payload.to),
    };
    if filter.ids.is_empty() && filter.room.is_none() && filter.range.is_none() {
        return Err(ApiError::bad_request(
            "ids, room, or a from/to range is required",
        ));
    }
    let deleted = state.admin_service.bulk_delete_messages(filter).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}
