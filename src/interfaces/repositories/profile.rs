use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use sqlx::PgPool;

use crate::{
    entities::profile::{ProfileUpsert, UserProfileRow},
    errors::AppError,
    repositories::sqlx_repo::SqlxProfileRepo,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    async fn find_profile(&self, id: &Uuid) -> Result<Option<UserProfileRow>, AppError>;
    async fn upsert_profile(&self, changes: &ProfileUpsert) -> Result<UserProfileRow, AppError>;
}

#[async_trait]
impl<T: ProfileRepository + ?Sized> ProfileRepository for Arc<T> {
    async fn check_connection(&self) -> Result<(), AppError> {
        (**self).check_connection().await
    }

    async fn find_profile(&self, id: &Uuid) -> Result<Option<UserProfileRow>, AppError> {
        (**self).find_profile(id).await
    }

    async fn upsert_profile(&self, changes: &ProfileUpsert) -> Result<UserProfileRow, AppError> {
        (**self).upsert_profile(changes).await
    }
}

impl SqlxProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxProfileRepo { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn find_profile(&self, id: &Uuid) -> Result<Option<UserProfileRow>, AppError> {
        sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn upsert_profile(&self, changes: &ProfileUpsert) -> Result<UserProfileRow, AppError> {
        // $4/$6/$8 flag whether phone, birth_date and avatar_url are part of the change
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            INSERT INTO user_profiles (
                id, email, name, phone, birth_date, avatar_url, avatar_updated_at, created_at, updated_at
            )
            VALUES (
                $1, $2, COALESCE($3, ''), $5, $7, $9,
                CASE WHEN $8 AND $9 IS NOT NULL THEN NOW() END,
                NOW(), NOW()
            )
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE(NULLIF(EXCLUDED.email, ''), user_profiles.email),
                name = COALESCE($3, user_profiles.name),
                phone = CASE WHEN $4 THEN $5 ELSE user_profiles.phone END,
                birth_date = CASE WHEN $6 THEN $7 ELSE user_profiles.birth_date END,
                avatar_url = CASE WHEN $8 THEN $9 ELSE user_profiles.avatar_url END,
                avatar_updated_at = CASE
                    WHEN $8 AND $9 IS NOT NULL THEN NOW()
                    WHEN $8 THEN NULL
                    ELSE user_profiles.avatar_updated_at
                END,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(changes.id)
        .bind(&changes.email)
        .bind(changes.name.as_deref())
        .bind(!changes.phone.is_unchanged())
        .bind(changes.phone.flatten_str())
        .bind(!changes.birth_date.is_unchanged())
        .bind(changes.birth_date.value_ref().copied())
        .bind(!changes.avatar_url.is_unchanged())
        .bind(changes.avatar_url.flatten_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
