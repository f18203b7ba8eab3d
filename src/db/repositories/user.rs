use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::query::{ListParams, ResourceQuerySpec, apply_features};
use crate::entities::{follows, prelude::*, users};

/// Fields reachable through the list pipeline. Password and reset columns
/// are deliberately absent from every list.
pub const USER_QUERY_SPEC: ResourceQuerySpec = ResourceQuerySpec {
    filterable: &["username", "email", "role", "verified"],
    sortable: &["created_at", "username", "name"],
    selectable: &[
        "id", "name", "username", "email", "photo", "phone", "passion", "bio", "role", "verified",
        "created_at",
    ],
    default_sort: "-created_at",
};

/// Signup payload after validation; password arrives in plaintext here and
/// leaves only as an Argon2id hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    pub password: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub verified: Option<bool>,
}

impl UserChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.photo.is_none()
            && self.phone.is_none()
            && self.passion.is_none()
            && self.bio.is_none()
            && self.role.is_none()
            && self.verified.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    SelfFollow,
    TargetMissing,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user. The stored record carries only the password hash.
    pub async fn create(&self, new_user: NewUser, security: &SecurityConfig) -> Result<users::Model> {
        let password = new_user.password.clone();
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let now = Utc::now().to_rfc3339();
        let active = users::ActiveModel {
            name: Set(new_user.name),
            username: Set(new_user.username.to_lowercase()),
            email: Set(new_user.email.to_lowercase()),
            photo: Set("default.jpg".to_string()),
            phone: Set(new_user.phone),
            passion: Set(new_user.passion),
            bio: Set(new_user.bio),
            role: Set("user".to_string()),
            password_hash: Set(password_hash),
            active: Set(true),
            verified: Set(false),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;
        Ok(model)
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let existing = Users::find()
            .filter(
                users::Column::Username
                    .eq(username.to_lowercase())
                    .or(users::Column::Email.eq(email.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to check username/email uniqueness")?;
        Ok(existing.is_some())
    }

    /// Active users only; soft-deleted records never come back from here.
    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        let user = Users::find_by_id(id)
            .filter(users::Column::Active.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username.to_lowercase()))
            .filter(users::Column::Active.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .filter(users::Column::Active.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;
        Ok(user)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<serde_json::Value>> {
        let select = Users::find().filter(users::Column::Active.eq(true));
        let select = apply_features(select, params, &USER_QUERY_SPEC);
        let rows = select
            .into_json()
            .all(&self.conn)
            .await
            .context("Failed to list users")?;
        Ok(rows)
    }

    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<users::Model>> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(username) = changes.username {
            active.username = Set(username.to_lowercase());
        }
        if let Some(email) = changes.email {
            active.email = Set(email.to_lowercase());
        }
        if let Some(photo) = changes.photo {
            active.photo = Set(photo);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(passion) = changes.passion {
            active.passion = Set(Some(passion));
        }
        if let Some(bio) = changes.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(verified) = changes.verified {
            active.verified = Set(verified);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;
        Ok(Some(updated))
    }

    /// Verify a plaintext password against a stored Argon2id hash.
    /// Runs on a blocking task because Argon2 is CPU-intensive.
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Rotate the password and stamp `password_changed_at`. The stamp is
    /// backdated by one second so a token issued in the same instant as the
    /// change is not rejected as stale.
    pub async fn update_password(
        &self,
        id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<users::Model> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let password = new_password.to_string();
        let security = security.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let changed_at = (Utc::now() - Duration::seconds(1)).to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.password_changed_at = Set(Some(changed_at));
        active.password_reset_token = Set(None);
        active.password_reset_expires = Set(None);
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }

    pub async fn set_reset_token(
        &self,
        id: i32,
        token_digest: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let expires = (Utc::now() + Duration::minutes(ttl_minutes)).to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_reset_token = Set(Some(token_digest.to_string()));
        active.password_reset_expires = Set(Some(expires));
        active.update(&self.conn).await?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(());
        };
        let mut active: users::ActiveModel = user.into();
        active.password_reset_token = Set(None);
        active.password_reset_expires = Set(None);
        active.update(&self.conn).await?;
        Ok(())
    }

    /// Look up a user by reset-token digest, honoring the expiry window.
    pub async fn find_by_reset_token(&self, token_digest: &str) -> Result<Option<users::Model>> {
        let now = Utc::now().to_rfc3339();
        let user = Users::find()
            .filter(users::Column::PasswordResetToken.eq(token_digest))
            .filter(users::Column::PasswordResetExpires.gt(now))
            .filter(users::Column::Active.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")?;
        Ok(user)
    }

    /// Soft delete: the row stays, default queries stop returning it.
    pub async fn soft_delete(&self, id: i32) -> Result<bool> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(false);
        };
        let mut active: users::ActiveModel = user.into();
        active.active = Set(false);
        active.update(&self.conn).await?;
        Ok(true)
    }

    /// Record a follow. The existence check and the insert run in one
    /// transaction so the relation can never be half-applied.
    pub async fn follow(&self, follower_id: i32, followee_id: i32) -> Result<FollowOutcome> {
        if follower_id == followee_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let txn = self.conn.begin().await?;

        let target = Users::find_by_id(followee_id)
            .filter(users::Column::Active.eq(true))
            .one(&txn)
            .await?;
        if target.is_none() {
            txn.rollback().await?;
            return Ok(FollowOutcome::TargetMissing);
        }

        let existing = Follows::find()
            .filter(follows::Column::FollowerId.eq(follower_id))
            .filter(follows::Column::FolloweeId.eq(followee_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let row = follows::ActiveModel {
            follower_id: Set(follower_id),
            followee_id: Set(followee_id),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        row.insert(&txn).await?;
        txn.commit().await?;

        Ok(FollowOutcome::Followed)
    }

    /// Users who follow `id`.
    pub async fn followers_of(&self, id: i32) -> Result<Vec<users::Model>> {
        let rows = Follows::find()
            .filter(follows::Column::FolloweeId.eq(id))
            .all(&self.conn)
            .await?;
        let ids: Vec<i32> = rows.iter().map(|f| f.follower_id).collect();
        self.active_users_by_ids(&ids).await
    }

    /// Users whom `id` follows.
    pub async fn following_of(&self, id: i32) -> Result<Vec<users::Model>> {
        let rows = Follows::find()
            .filter(follows::Column::FollowerId.eq(id))
            .all(&self.conn)
            .await?;
        let ids: Vec<i32> = rows.iter().map(|f| f.followee_id).collect();
        self.active_users_by_ids(&ids).await
    }

    async fn active_users_by_ids(&self, ids: &[i32]) -> Result<Vec<users::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = Users::find()
            .filter(users::Column::Id.is_in(ids.to_vec()))
            .filter(users::Column::Active.eq(true))
            .all(&self.conn)
            .await?;
        Ok(users)
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, security: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        security.argon2_memory_cost_kib,
        security.argon2_time_cost,
        security.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
