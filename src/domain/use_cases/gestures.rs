use std::{collections::BTreeMap, fmt, sync::Arc};

use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::entities::{
    category::Category,
    gesture::{
        Gesture, GestureUpdate, NewGestureRequest, SaveStage, SavedGestureResponse, UpdateGestureRequest,
    },
    image::{UploadPurpose, UploadResult},
    option_fields::OptionField,
    session::Session,
};
use crate::errors::{AppError, FieldError};
use crate::media::{classify, ImagePipeline};
use crate::repositories::gesture::GestureRepository;

pub const SEARCH_LIMIT: i64 = 20;

/// A failed save, tagged with the stage it failed in.
#[derive(Debug)]
pub struct SaveFailure {
    pub stage: SaveStage,
    pub error: AppError,
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "save failed while {}: {}", self.stage, self.error)
    }
}

impl From<SaveFailure> for AppError {
    fn from(failure: SaveFailure) -> Self {
        failure.error
    }
}

/// Tracks the stage of one save action.
struct SaveFlow {
    action: &'static str,
    stage: SaveStage,
}

impl SaveFlow {
    fn start(action: &'static str) -> Self {
        SaveFlow { action, stage: SaveStage::Idle }
    }

    fn enter(&mut self, stage: SaveStage) {
        tracing::debug!(action = self.action, from = %self.stage, to = %stage, "Save stage");
        self.stage = stage;
    }

    fn fail(&mut self, error: impl Into<AppError>) -> SaveFailure {
        let error = error.into();
        let stage = self.stage;
        tracing::warn!(action = self.action, %stage, %error, "Gesture save failed");
        self.stage = SaveStage::Failed;
        SaveFailure { stage, error }
    }
}

fn field_error(field: &str, message: impl Into<String>) -> AppError {
    AppError::ValidationError(vec![FieldError {
        field: field.to_string(),
        message: message.into(),
    }])
}

fn parse_category(field: &str, raw: &str) -> Result<Category, AppError> {
    raw.parse::<Category>().map_err(|e| field_error(field, e.to_string()))
}

/// Blank descriptions clear the column.
fn normalize_description(description: OptionField<String>) -> OptionField<String> {
    match description {
        OptionField::SetToValue(d) if d.trim().is_empty() => OptionField::SetToNull,
        OptionField::SetToValue(d) => OptionField::SetToValue(d.trim().to_string()),
        other => other,
    }
}

pub struct GestureHandler<R>
where
    R: GestureRepository,
{
    pub gesture_repo: R,
    pub pipeline: Arc<ImagePipeline>,
}

impl<R> GestureHandler<R>
where
    R: GestureRepository,
{
    pub fn new(gesture_repo: R, pipeline: Arc<ImagePipeline>) -> Self {
        GestureHandler { gesture_repo, pipeline }
    }

    /// Validate, upload the image, then insert the record.
    pub async fn save_gesture(
        &self,
        session: &Session,
        request: NewGestureRequest,
        cancel: &CancellationToken,
    ) -> Result<SavedGestureResponse, SaveFailure> {
        let mut flow = SaveFlow::start("create");

        flow.enter(SaveStage::Validating);
        request.validate().map_err(|e| flow.fail(e))?;
        let category = parse_category("category_id", &request.category_id).map_err(|e| flow.fail(e))?;
        let handle = classify(&request.image).map_err(|e| flow.fail(e))?;

        flow.enter(SaveStage::Uploading);
        let uploaded = self
            .pipeline
            .ingest(&session.user_id, &handle, UploadPurpose::Gesture, cancel)
            .await
            .map_err(|e| flow.fail(e))?;
        let image_url = match uploaded {
            UploadResult::Uploaded { url, .. } => url,
            UploadResult::Failed { error } => return Err(flow.fail(AppError::UploadFailed(error))),
        };

        if cancel.is_cancelled() {
            tracing::warn!(%image_url, "Save cancelled after upload, image left orphaned");
            return Err(flow.fail(AppError::Cancelled));
        }

        flow.enter(SaveStage::Writing);
        let insert = request.prepare_for_insert(session.user_id, category, image_url);
        let gesture = match self.gesture_repo.create_gesture(&insert).await {
            Ok(gesture) => gesture,
            Err(e) => {
                tracing::warn!(image_url = %insert.image_url, "Gesture insert failed, uploaded image left orphaned");
                return Err(flow.fail(e));
            }
        };

        flow.enter(SaveStage::Succeeded);
        tracing::info!(gesture_id = gesture.id, category = %category, "Gesture created");
        Ok(SavedGestureResponse { gesture, image_uploaded: true })
    }

    /// Partial update. The upload is skipped when the submitted image is the stored URL.
    pub async fn update_gesture(
        &self,
        session: &Session,
        id: i64,
        request: UpdateGestureRequest,
        cancel: &CancellationToken,
    ) -> Result<SavedGestureResponse, SaveFailure> {
        let mut flow = SaveFlow::start("update");

        flow.enter(SaveStage::Validating);
        request.validate().map_err(|e| flow.fail(e))?;
        if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(flow.fail(field_error("name", "Informe o nome do gesto")));
        }
        let category = match request.category_id.as_deref() {
            Some(raw) => Some(parse_category("category_id", raw).map_err(|e| flow.fail(e))?),
            None => None,
        };

        let existing = self
            .gesture_repo
            .find_gesture(id, &session.user_id)
            .await
            .map_err(|e| flow.fail(e))?
            .ok_or_else(|| flow.fail(AppError::NotFound("Gesto não encontrado".into())))?;

        let new_image = match request.image.as_deref().map(str::trim) {
            Some(image) if image != existing.image_url => Some(classify(image).map_err(|e| flow.fail(e))?),
            Some(_) => {
                tracing::debug!(gesture_id = id, "Image unchanged, skipping upload");
                None
            }
            None => None,
        };

        let image_url = match new_image {
            Some(handle) => {
                flow.enter(SaveStage::Uploading);
                let uploaded = self
                    .pipeline
                    .ingest(&session.user_id, &handle, UploadPurpose::Gesture, cancel)
                    .await
                    .map_err(|e| flow.fail(e))?;
                match uploaded {
                    UploadResult::Uploaded { url, .. } => Some(url),
                    UploadResult::Failed { error } => return Err(flow.fail(AppError::UploadFailed(error))),
                }
            }
            None => None,
        };
        let image_uploaded = image_url.is_some();

        if cancel.is_cancelled() {
            if let Some(url) = &image_url {
                tracing::warn!(%url, "Update cancelled after upload, image left orphaned");
            }
            return Err(flow.fail(AppError::Cancelled));
        }

        let changes = GestureUpdate {
            name: request.name.map(|n| n.trim().to_string()),
            description: normalize_description(request.description),
            category,
            icon_reference: request.icon_reference,
            image_url,
        };
        if changes.is_empty() {
            flow.enter(SaveStage::Succeeded);
            tracing::debug!(gesture_id = id, "Nothing to change, skipping write");
            return Ok(SavedGestureResponse { gesture: existing, image_uploaded: false });
        }

        flow.enter(SaveStage::Writing);
        let gesture = match self.gesture_repo.update_gesture(id, &session.user_id, &changes).await {
            Ok(gesture) => gesture,
            Err(e) => {
                if let Some(url) = &changes.image_url {
                    tracing::warn!(%url, "Gesture update failed, uploaded image left orphaned");
                }
                return Err(flow.fail(e));
            }
        };

        flow.enter(SaveStage::Succeeded);
        tracing::info!(gesture_id = gesture.id, image_uploaded, "Gesture updated");
        Ok(SavedGestureResponse { gesture, image_uploaded })
    }

    pub async fn delete_gesture(&self, session: &Session, id: i64) -> Result<(), AppError> {
        self.gesture_repo.delete_gesture(id, &session.user_id).await?;
        tracing::info!(gesture_id = id, "Gesture deleted");
        Ok(())
    }

    pub async fn get_gesture(&self, session: &Session, id: i64) -> Result<Gesture, AppError> {
        self.gesture_repo
            .find_gesture(id, &session.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Gesto não encontrado".into()))
    }

    pub async fn list_gestures(&self, session: &Session) -> Result<Vec<Gesture>, AppError> {
        self.gesture_repo.list_gestures(&session.user_id).await
    }

    pub async fn list_by_category(&self, session: &Session, category: &str) -> Result<Vec<Gesture>, AppError> {
        let category = parse_category("category", category)?;
        self.gesture_repo
            .list_gestures_by_category(&session.user_id, category)
            .await
    }

    /// Case-insensitive substring match on the name, newest first.
    pub async fn search(&self, session: &Session, term: &str) -> Result<Vec<Gesture>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.gesture_repo
            .search_gestures(&session.user_id, term, SEARCH_LIMIT)
            .await
    }

    /// Every category is present, empty ones with 0.
    pub async fn count_by_category(&self, session: &Session) -> Result<BTreeMap<Category, i64>, AppError> {
        let mut counts: BTreeMap<Category, i64> = Category::ALL.into_iter().map(|c| (c, 0)).collect();

        for (raw, total) in self.gesture_repo.count_gestures_by_category(&session.user_id).await? {
            match raw.parse::<Category>() {
                Ok(category) => {
                    counts.insert(category, total);
                }
                Err(_) => tracing::warn!(category = %raw, "Ignoring gestures with unknown category"),
            }
        }

        Ok(counts)
    }
}
