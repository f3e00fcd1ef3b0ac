//! Startup seeding: the default admin account and the built-in rooms,
//! created only when missing so restarts are idempotent.

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use application::{Clock, RegisterRequest, RoomRepository, UserRepository, UserService};
use config::SeedConfig;
use domain::{Room, RoomId, RoomName};
use tracing::info;

pub async fn run(
    seed: &SeedConfig,
    user_service: &UserService,
    user_repository: &Arc<dyn UserRepository>,
    room_repository: &Arc<dyn RoomRepository>,
    clock: &Arc<dyn Clock>,
) -> Result<()> {
    let admin = match user_repository.find_by_username(&seed.admin_username).await? {
        Some(existing) => existing,
        None => {
            let admin = user_service
                .register(RegisterRequest {
                    username: seed.admin_username.clone(),
                    email: seed.admin_email.clone(),
                    password: seed.admin_password.clone(),
                    admin_code: Some(seed.admin_code.clone()),
                })
                .await?;
            info!(username = %admin.username, "seeded default admin");
            admin
        }
    };

    for (name, description) in &seed.default_rooms {
        let name = match RoomName::parse(name) {
            Ok(name) => name,
            Err(err) => {
                anyhow::bail!("invalid seed room name {name:?}: {err}");
            }
        };
        if room_repository.find_by_name(name.as_str()).await?.is_some() {
            continue;
        }
        let room = Room::new(
            RoomId::new(Uuid::new_v4()),
            name,
            Some(description.clone()),
            false,
            Some(admin.id),
            clock.now(),
        );
        let room = room_repository.create(room).await?;
        info!(room = %room.name, "seeded default room");
    }

    Ok(())
}
