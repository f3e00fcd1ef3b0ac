mod support;

use reqwest::StatusCode;
use serde_json::{json, Value};

use support::{spawn_app, ADMIN_CODE};

async fn register(client: &reqwest::Client, addr: &str, body: Value) -> Value {
    client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&body)
        .send()
        .await
        .expect("register")
        .json()
        .await
        .expect("register json")
}

#[tokio::test]
async fn register_login_and_profile() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register(
        &client,
        &addr,
        json!({"username": "alice", "email": "Alice@Example.com", "password": "secret"}),
    )
    .await;
    assert_eq!(registered["user"]["username"], "alice");
    // Emails are normalized to lowercase and hashes never serialize.
    assert_eq!(registered["user"]["email"], "alice@example.com");
    assert!(registered["user"].get("password_hash").is_none());

    // Duplicate registration is rejected.
    let dup = client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({"username": "alice", "email": "other@example.com", "password": "secret"}))
        .send()
        .await
        .expect("dup register");
    assert_eq!(dup.status(), StatusCode::BAD_REQUEST);

    // Login by email, then by bare username.
    for identifier in ["alice@example.com", "alice"] {
        let login: Value = client
            .post(format!("http://{addr}/api/auth/login"))
            .json(&json!({"email": identifier, "password": "secret"}))
            .send()
            .await
            .expect("login")
            .json()
            .await
            .expect("login json");
        assert!(login["token"].as_str().is_some());
    }

    let bad = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "alice", "password": "wrong"}))
        .send()
        .await
        .expect("bad login");
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    let token = register(
        &client,
        &addr,
        json!({"username": "bob", "email": "bob@example.com", "password": "secret"}),
    )
    .await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let me: Value = client
        .get(format!("http://{addr}/api/auth/me"))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("me json");
    assert_eq!(me["username"], "bob");

    let unauthorized = client
        .get(format!("http://{addr}/api/auth/me"))
        .send()
        .await
        .expect("me without token");
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn room_directory_and_creation() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let token = register(
        &client,
        &addr,
        json!({"username": "carol", "email": "carol@example.com", "password": "secret"}),
    )
    .await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let created = client
        .post(format!("http://{addr}/api/rooms"))
        .header("authorization", format!("Bearer {token}"))
        .json(&json!({"name": "DevOps", "description": "pipelines"}))
        .send()
        .await
        .expect("create room");
    assert_eq!(created.status(), StatusCode::CREATED);
    let room: Value = created.json().await.expect("room json");
    assert_eq!(room["name"], "devops");

    // Names are validated and deduplicated at creation.
    for (name, expected) in [
        ("devops", StatusCode::BAD_REQUEST),
        ("x", StatusCode::BAD_REQUEST),
        ("bad name!", StatusCode::BAD_REQUEST),
    ] {
        let response = client
            .post(format!("http://{addr}/api/rooms"))
            .header("authorization", format!("Bearer {token}"))
            .json(&json!({"name": name}))
            .send()
            .await
            .expect("create room");
        assert_eq!(response.status(), expected, "room name {name:?}");
    }

    let rooms: Value = client
        .get(format!("http://{addr}/api/rooms"))
        .send()
        .await
        .expect("list rooms")
        .json()
        .await
        .expect("rooms json");
    let rooms = rooms.as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["name"], "devops");
    assert_eq!(rooms[0]["member_count"], 1);
    assert_eq!(rooms[0]["message_count"], 0);
}

#[tokio::test]
async fn admin_surface_is_permission_gated() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = register(
        &client,
        &addr,
        json!({
            "username": "root",
            "email": "root@example.com",
            "password": "secret",
            "admin_code": ADMIN_CODE
        }),
    )
    .await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let user = register(
        &client,
        &addr,
        json!({"username": "dave", "email": "dave@example.com", "password": "secret"}),
    )
    .await;
    let user_token = user["token"].as_str().unwrap().to_string();
    let user_id = user["user"]["id"].as_str().unwrap().to_string();

    // A regular user is turned away.
    let forbidden = client
        .get(format!("http://{addr}/api/admin/users"))
        .header("authorization", format!("Bearer {user_token}"))
        .send()
        .await
        .expect("admin users as user");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    // The admin sees the dashboard view with activity stats.
    let views: Value = client
        .get(format!("http://{addr}/api/admin/users"))
        .header("authorization", format!("Bearer {admin_token}"))
        .send()
        .await
        .expect("admin users")
        .json()
        .await
        .expect("admin users json");
    let views = views.as_array().unwrap();
    assert_eq!(views.len(), 2);
    assert!(views.iter().any(|v| v["username"] == "root" && v["role"] == "admin"));

    // Granting a single permission flag to a regular user.
    let updated: Value = client
        .put(format!("http://{addr}/api/admin/users/{user_id}"))
        .header("authorization", format!("Bearer {admin_token}"))
        .json(&json!({"permissions": {
            "can_delete_messages": true,
            "can_delete_users": false,
            "can_manage_rooms": false,
            "can_view_all_users": false
        }}))
        .send()
        .await
        .expect("update user")
        .json()
        .await
        .expect("update json");
    assert_eq!(updated["permissions"]["can_delete_messages"], true);

    // An unconstrained bulk delete is refused outright.
    let refused = client
        .post(format!("http://{addr}/api/admin/messages/bulk-delete"))
        .header("authorization", format!("Bearer {admin_token}"))
        .json(&json!({}))
        .send()
        .await
        .expect("bulk delete");
    assert_eq!(refused.status(), StatusCode::BAD_REQUEST);

    // Admin accounts cannot be deleted, even by admins.
    let root_id = views
        .iter()
        .find(|v| v["username"] == "root")
        .and_then(|v| v["id"].as_str())
        .unwrap();
    let refused = client
        .delete(format!("http://{addr}/api/admin/users/{root_id}"))
        .header("authorization", format!("Bearer {admin_token}"))
        .send()
        .await
        .expect("delete admin");
    assert_eq!(refused.status(), StatusCode::BAD_REQUEST);

    // Deleting the regular user works and removes the account.
    let deleted = client
        .delete(format!("http://{addr}/api/admin/users/{user_id}"))
        .header("authorization", format!("Bearer {admin_token}"))
        .send()
        .await
        .expect("delete user");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = client
        .get(format!("http://{addr}/api/auth/me"))
        .header("authorization", format!("Bearer {user_token}"))
        .send()
        .await
        .expect("me after delete");
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
