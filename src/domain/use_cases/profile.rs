use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::entities::{
    image::{UploadImageRequest, UploadPurpose, UploadResult},
    option_fields::OptionField,
    profile::{avatar_display_url, AvatarResponse, ProfileUpsert, UpdateProfileRequest, UserProfile},
    session::Session,
};
use crate::errors::{AppError, FieldError};
use crate::media::{classify, ImagePipeline};
use crate::repositories::profile::ProfileRepository;

pub struct ProfileHandler<P>
where
    P: ProfileRepository,
{
    pub profile_repo: P,
    pub pipeline: Arc<ImagePipeline>,
}

impl<P> ProfileHandler<P>
where
    P: ProfileRepository,
{
    pub fn new(profile_repo: P, pipeline: Arc<ImagePipeline>) -> Self {
        ProfileHandler { profile_repo, pipeline }
    }

    /// Falls back to a profile built from the session when no row exists yet.
    pub async fn get_profile(&self, session: &Session) -> Result<UserProfile, AppError> {
        let profile = match self.profile_repo.find_profile(&session.user_id).await? {
            Some(row) => UserProfile::from_row(row, session),
            None => {
                tracing::debug!(user_id = %session.user_id, "No profile row yet, using defaults");
                UserProfile::default_for(session)
            }
        };
        Ok(profile)
    }

    pub async fn update_profile(&self, session: &Session, request: UpdateProfileRequest) -> Result<UserProfile, AppError> {
        request.validate()?;
        if request.nome.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::ValidationError(vec![FieldError {
                field: "nome".into(),
                message: "Informe o seu nome".into(),
            }]));
        }

        let mut changes = request.into_upsert(session);
        if changes.phone.flatten_str().is_some_and(|p| p.trim().is_empty()) {
            changes.phone = OptionField::SetToNull;
        }

        let row = self.profile_repo.upsert_profile(&changes).await?;
        tracing::info!(user_id = %session.user_id, "Profile updated");
        Ok(UserProfile::from_row(row, session))
    }

    /// Hosts the image in the avatar bucket and points the profile at it.
    pub async fn upload_avatar(
        &self,
        session: &Session,
        request: UploadImageRequest,
        cancel: &CancellationToken,
    ) -> Result<AvatarResponse, AppError> {
        request.validate()?;
        let handle = classify(&request.image)?;

        let url = match self
            .pipeline
            .ingest(&session.user_id, &handle, UploadPurpose::Avatar, cancel)
            .await?
        {
            UploadResult::Uploaded { url, .. } => url,
            UploadResult::Failed { error } => return Err(AppError::UploadFailed(error)),
        };

        if cancel.is_cancelled() {
            tracing::warn!(%url, "Avatar update cancelled after upload, image left orphaned");
            return Err(AppError::Cancelled);
        }

        let changes = ProfileUpsert {
            id: session.user_id,
            email: session.email.clone(),
            avatar_url: OptionField::SetToValue(url.clone()),
            ..Default::default()
        };
        let row = match self.profile_repo.upsert_profile(&changes).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(%url, "Profile write failed, uploaded avatar left orphaned");
                return Err(e);
            }
        };

        let profile = UserProfile::from_row(row, session);
        tracing::info!(user_id = %session.user_id, "Avatar updated");
        Ok(AvatarResponse {
            display_url: avatar_display_url(&profile, Utc::now()),
            avatar_url: profile.avatar_url,
        })
    }

    /// Deletes the stored object when it lives in the avatar bucket, then clears the column.
    pub async fn remove_avatar(&self, session: &Session) -> Result<AvatarResponse, AppError> {
        let current = self
            .profile_repo
            .find_profile(&session.user_id)
            .await?
            .and_then(|row| row.avatar_url);

        let uploader = self.pipeline.uploader();
        if let Some(path) = current
            .as_deref()
            .and_then(|url| uploader.stored_path(url, UploadPurpose::Avatar))
        {
            uploader
                .remove(UploadPurpose::Avatar, vec![path.clone()])
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to remove avatar {path}: {e}")))?;
        }

        let changes = ProfileUpsert {
            id: session.user_id,
            email: session.email.clone(),
            avatar_url: OptionField::SetToNull,
            ..Default::default()
        };
        let row = self.profile_repo.upsert_profile(&changes).await?;
        let profile = UserProfile::from_row(row, session);

        tracing::info!(user_id = %session.user_id, "Avatar removed");
        Ok(AvatarResponse {
            display_url: avatar_display_url(&profile, Utc::now()),
            avatar_url: profile.avatar_url,
        })
    }
}
