use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::{
    category::{validate_category, Category},
    option_fields::OptionField,
};

const MAX_NAME_LENGTH: u64 = 50;
const MAX_DESCRIPTION_LENGTH: u64 = 200;
const MAX_ICON_LENGTH: u64 = 100;

// ───── Database Models ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Gesture {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub icon_reference: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureInsert {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub icon_reference: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column changes for an owner-scoped update. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GestureUpdate {
    pub name: Option<String>,
    pub description: OptionField<String>,
    pub category: Option<Category>,
    pub icon_reference: Option<String>,
    pub image_url: Option<String>,
}

impl GestureUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_unchanged()
            && self.category.is_none()
            && self.icon_reference.is_none()
            && self.image_url.is_none()
    }
}

// ───── Request DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGestureRequest {
    #[validate(
        length(min = 1, max = MAX_NAME_LENGTH, message = "O nome deve ter entre 1 e 50 caracteres"),
        custom(function = "validate_not_blank", message = "Informe o nome do gesto")
    )]
    pub name: String,

    #[validate(length(max = MAX_DESCRIPTION_LENGTH, message = "A descrição deve ter no máximo 200 caracteres"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_category"))]
    pub category_id: String,

    #[serde(default)]
    #[validate(length(max = MAX_ICON_LENGTH))]
    pub icon_reference: String,

    #[validate(length(min = 1, message = "Selecione uma imagem para o gesto"))]
    pub image: String,
}

impl NewGestureRequest {
    pub fn prepare_for_insert(&self, owner_id: Uuid, category: Category, image_url: String) -> GestureInsert {
        let now = Utc::now();
        GestureInsert {
            owner_id,
            name: self.name.trim().to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            category,
            icon_reference: self.icon_reference.clone(),
            image_url,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateGestureRequest {
    /// Blank names are rejected by the use case.
    #[validate(length(min = 1, max = MAX_NAME_LENGTH, message = "O nome deve ter entre 1 e 50 caracteres"))]
    pub name: Option<String>,

    #[validate(length(max = MAX_DESCRIPTION_LENGTH, message = "A descrição deve ter no máximo 200 caracteres"))]
    pub description: OptionField<String>,

    /// Checked against [`Category`] by the use case.
    pub category_id: Option<String>,

    #[validate(length(max = MAX_ICON_LENGTH))]
    pub icon_reference: Option<String>,

    /// New image handle, or the stored URL when the image did not change.
    #[validate(length(min = 1, message = "Selecione uma imagem para o gesto"))]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GestureSearchQuery {
    pub nome: String,
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// ───── Save flow ─────────────────────────────────────────────────────

/// Stages a save or edit action moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    Idle,
    Validating,
    Uploading,
    Writing,
    Succeeded,
    Failed,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaveStage::Idle => "idle",
            SaveStage::Validating => "validating",
            SaveStage::Uploading => "uploading",
            SaveStage::Writing => "writing",
            SaveStage::Succeeded => "succeeded",
            SaveStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
pub struct SavedGestureResponse {
    pub gesture: Gesture,
    pub image_uploaded: bool,
}
