use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use sqlx::PgPool;

use crate::{
    entities::{
        category::Category,
        gesture::{Gesture, GestureInsert, GestureUpdate},
    },
    errors::AppError,
    repositories::sqlx_repo::SqlxGestureRepo,
};

/// Every query is scoped to the owning user; callers cannot reach other users' rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GestureRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    async fn create_gesture(&self, gesture: &GestureInsert) -> Result<Gesture, AppError>;
    async fn find_gesture(&self, id: i64, owner_id: &Uuid) -> Result<Option<Gesture>, AppError>;
    async fn list_gestures(&self, owner_id: &Uuid) -> Result<Vec<Gesture>, AppError>;
    async fn list_gestures_by_category(&self, owner_id: &Uuid, category: Category) -> Result<Vec<Gesture>, AppError>;
    async fn search_gestures(&self, owner_id: &Uuid, name: &str, limit: i64) -> Result<Vec<Gesture>, AppError>;
    async fn count_gestures_by_category(&self, owner_id: &Uuid) -> Result<Vec<(String, i64)>, AppError>;
    async fn update_gesture(&self, id: i64, owner_id: &Uuid, changes: &GestureUpdate) -> Result<Gesture, AppError>;
    async fn delete_gesture(&self, id: i64, owner_id: &Uuid) -> Result<(), AppError>;
}

#[async_trait]
impl<T: GestureRepository + ?Sized> GestureRepository for Arc<T> {
    async fn check_connection(&self) -> Result<(), AppError> {
        (**self).check_connection().await
    }

    async fn create_gesture(&self, gesture: &GestureInsert) -> Result<Gesture, AppError> {
        (**self).create_gesture(gesture).await
    }

    async fn find_gesture(&self, id: i64, owner_id: &Uuid) -> Result<Option<Gesture>, AppError> {
        (**self).find_gesture(id, owner_id).await
    }

    async fn list_gestures(&self, owner_id: &Uuid) -> Result<Vec<Gesture>, AppError> {
        (**self).list_gestures(owner_id).await
    }

    async fn list_gestures_by_category(&self, owner_id: &Uuid, category: Category) -> Result<Vec<Gesture>, AppError> {
        (**self).list_gestures_by_category(owner_id, category).await
    }

    async fn search_gestures(&self, owner_id: &Uuid, name: &str, limit: i64) -> Result<Vec<Gesture>, AppError> {
        (**self).search_gestures(owner_id, name, limit).await
    }

    async fn count_gestures_by_category(&self, owner_id: &Uuid) -> Result<Vec<(String, i64)>, AppError> {
        (**self).count_gestures_by_category(owner_id).await
    }

    async fn update_gesture(&self, id: i64, owner_id: &Uuid, changes: &GestureUpdate) -> Result<Gesture, AppError> {
        (**self).update_gesture(id, owner_id, changes).await
    }

    async fn delete_gesture(&self, id: i64, owner_id: &Uuid) -> Result<(), AppError> {
        (**self).delete_gesture(id, owner_id).await
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SqlxGestureRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxGestureRepo { pool }
    }
}

#[async_trait]
impl GestureRepository for SqlxGestureRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn create_gesture(&self, gesture: &GestureInsert) -> Result<Gesture, AppError> {
        let created = sqlx::query_as::<_, Gesture>(
            r#"
            INSERT INTO gestures (
                owner_id, name, description, category_id, icon_reference, image_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(gesture.owner_id)
        .bind(&gesture.name)
        .bind(&gesture.description)
        .bind(gesture.category.as_str())
        .bind(&gesture.icon_reference)
        .bind(&gesture.image_url)
        .bind(gesture.created_at)
        .bind(gesture.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_gesture(&self, id: i64, owner_id: &Uuid) -> Result<Option<Gesture>, AppError> {
        sqlx::query_as::<_, Gesture>("SELECT * FROM gestures WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_gestures(&self, owner_id: &Uuid) -> Result<Vec<Gesture>, AppError> {
        sqlx::query_as::<_, Gesture>(
            "SELECT * FROM gestures WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_gestures_by_category(&self, owner_id: &Uuid, category: Category) -> Result<Vec<Gesture>, AppError> {
        sqlx::query_as::<_, Gesture>(
            r#"
            SELECT * FROM gestures
            WHERE owner_id = $1 AND category_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn search_gestures(&self, owner_id: &Uuid, name: &str, limit: i64) -> Result<Vec<Gesture>, AppError> {
        sqlx::query_as::<_, Gesture>(
            r#"
            SELECT * FROM gestures
            WHERE owner_id = $1 AND name ILIKE $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(owner_id)
        .bind(like_pattern(name))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn count_gestures_by_category(&self, owner_id: &Uuid) -> Result<Vec<(String, i64)>, AppError> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category_id, COUNT(*) AS total
            FROM gestures
            WHERE owner_id = $1
            GROUP BY category_id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn update_gesture(&self, id: i64, owner_id: &Uuid, changes: &GestureUpdate) -> Result<Gesture, AppError> {
        // COALESCE keeps the stored value when a column is not part of the change set
        let updated = sqlx::query_as::<_, Gesture>(
            r#"
            UPDATE gestures SET
                name = COALESCE($1, name),
                description = CASE WHEN $2 THEN $3 ELSE description END,
                category_id = COALESCE($4, category_id),
                icon_reference = COALESCE($5, icon_reference),
                image_url = COALESCE($6, image_url),
                updated_at = NOW()
            WHERE id = $7 AND owner_id = $8
            RETURNING *
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(!changes.description.is_unchanged())
        .bind(changes.description.flatten_str())
        .bind(changes.category.map(|c| c.as_str()))
        .bind(changes.icon_reference.as_deref())
        .bind(changes.image_url.as_deref())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::NotFound("Gesto não encontrado".to_string()))
    }

    async fn delete_gesture(&self, id: i64, owner_id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM gestures WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Gesto não encontrado".to_string()));
        }

        Ok(())
    }
}
