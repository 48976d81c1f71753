use crate::config::parse_bool_env;
use crate::error::AppResult;
use crate::models::{user, Role, User};
use crate::utils::hash_password;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::env;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub display_name: String,
    pub password: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !parse_bool_env("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        let username = env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?;
        Some(Self {
            display_name: env::var("BOOTSTRAP_ADMIN_DISPLAY_NAME")
                .unwrap_or_else(|_| "Administrator".to_string()),
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
            username,
        })
    }
}

/// Make sure the deployment has an administrator on first boot:
/// - an active admin already exists: nothing to do
/// - the configured username exists: promote and re-enable it
/// - otherwise create a fresh admin account
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };

    let admin_exists = User::find()
        .filter(user::Column::Role.eq(Role::Admin))
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(user::Column::Username.eq(cfg.username.clone()))
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = existing {
        let mut active: user::ActiveModel = existing.into();
        active.role = Set(Role::Admin);
        active.is_active = Set(true);
        active.updated_at = Set(now);
        active.update(db).await?;
        tracing::warn!(username = %cfg.username, "Promoted existing account to administrator");
        return Ok(());
    }

    let new_user = user::ActiveModel {
        username: Set(cfg.username.clone()),
        display_name: Set(cfg.display_name),
        password_hash: Set(hash_password(&cfg.password)?),
        role: Set(Role::Admin),
        department: Set(None),
        employee_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_user.insert(db).await?;
    tracing::info!(username = %cfg.username, "Bootstrap administrator created");
    Ok(())
}
