use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{option_fields::OptionField, session::Session};

const FALLBACK_AVATAR_BASE: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub avatar_url: Option<String>,
    pub avatar_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub nome: String,
    pub telefone: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub avatar_url: Option<String>,
    pub avatar_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Profile used when the signup flow has not written a row yet.
    pub fn default_for(session: &Session) -> Self {
        UserProfile {
            id: session.user_id,
            email: session.email.clone(),
            nome: String::new(),
            telefone: None,
            data_nascimento: None,
            avatar_url: None,
            avatar_updated_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn from_row(row: UserProfileRow, session: &Session) -> Self {
        UserProfile {
            id: row.id,
            email: row.email.filter(|e| !e.is_empty()).unwrap_or_else(|| session.email.clone()),
            nome: row.name.unwrap_or_default(),
            telefone: row.phone,
            data_nascimento: row.birth_date,
            avatar_url: row.avatar_url,
            avatar_updated_at: row.avatar_updated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Column changes written with insert-or-update on `id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileUpsert {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone: OptionField<String>,
    pub birth_date: OptionField<NaiveDate>,
    pub avatar_url: OptionField<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres"))]
    pub nome: Option<String>,

    #[validate(length(max = 20, message = "Telefone inválido"))]
    pub telefone: OptionField<String>,

    /// `YYYY-MM-DD`
    pub data_nascimento: OptionField<NaiveDate>,
}

impl UpdateProfileRequest {
    pub fn into_upsert(self, session: &Session) -> ProfileUpsert {
        ProfileUpsert {
            id: session.user_id,
            email: session.email.clone(),
            name: self.nome.map(|n| n.trim().to_string()),
            phone: self.telefone,
            birth_date: self.data_nascimento,
            avatar_url: OptionField::Unchanged,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: Option<String>,
    pub display_url: String,
}

/// Appends a `t=<millis>` query parameter so clients refetch a replaced image.
pub fn cache_busted_url(url: &str, now: DateTime<Utc>) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={}", now.timestamp_millis())
}

/// Generated initials avatar for users without an uploaded picture.
pub fn fallback_avatar_url(user_id: Option<&Uuid>, size: u32) -> String {
    let name = user_id
        .map(|id| id.simple().to_string().chars().take(8).collect::<String>())
        .unwrap_or_else(|| "U".to_string());

    format!(
        "{FALLBACK_AVATAR_BASE}?name={}&background=8BC5E5&color=fff&bold=true&size={size}",
        urlencoding::encode(&name)
    )
}

pub fn avatar_display_url(profile: &UserProfile, now: DateTime<Utc>) -> String {
    match profile.avatar_url.as_deref() {
        Some(url) if !url.is_empty() => cache_busted_url(url, now),
        _ => fallback_avatar_url(Some(&profile.id), 200),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> Session {
        Session::new(Uuid::parse_str("6f1c2d3e-0000-4000-8000-000000000001").unwrap(), "ana@example.com")
    }

    #[test]
    fn default_profile_uses_session_identity() {
        let profile = UserProfile::default_for(&session());
        assert_eq!(profile.id, session().user_id);
        assert_eq!(profile.email, "ana@example.com");
        assert!(profile.nome.is_empty());
        assert!(profile.avatar_url.is_none());
    }

    #[test]
    fn row_without_email_falls_back_to_session() {
        let row = UserProfileRow {
            id: session().user_id,
            email: None,
            name: Some("Ana".into()),
            phone: None,
            birth_date: NaiveDate::from_ymd_opt(2015, 3, 9),
            avatar_url: None,
            avatar_updated_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        let profile = UserProfile::from_row(row, &session());
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(profile.nome, "Ana");
    }

    #[test]
    fn cache_busting_picks_separator() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(cache_busted_url("https://cdn/a.png", now), "https://cdn/a.png?t=1700000000123");
        assert_eq!(cache_busted_url("https://cdn/a.png?w=10", now), "https://cdn/a.png?w=10&t=1700000000123");
    }

    #[test]
    fn fallback_avatar_uses_short_user_id() {
        let url = fallback_avatar_url(Some(&session().user_id), 120);
        assert!(url.contains("name=6f1c2d3e"));
        assert!(url.ends_with("size=120"));
        assert!(fallback_avatar_url(None, 200).contains("name=U"));
    }

    #[test]
    fn birth_date_parses_iso_format() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"nome": "Ana", "data_nascimento": "2015-03-09"}"#).unwrap();
        assert_eq!(req.data_nascimento, OptionField::SetToValue(NaiveDate::from_ymd_opt(2015, 3, 9).unwrap()));

        let bad = serde_json::from_str::<UpdateProfileRequest>(r#"{"data_nascimento": "09/03/2015"}"#);
        assert!(bad.is_err());
    }
}
