use std::sync::Arc;

use tokio_util::sync::CancellationToken;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{entities, media, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db, storage};

use auth::jwt::JwtService;
use errors::AppError;
use media::{ImageMaterializer, ImagePipeline, ImageUploader};
use repositories::{
    gesture::GestureRepository,
    media::{BlobRegistry, MediaReader},
    object_store::ObjectStore,
    profile::ProfileRepository,
    sqlx_repo::{SqlxGestureRepo, SqlxProfileRepo},
    token::SessionVerifier,
};
use storage::{blob_registry::InMemoryBlobRegistry, media_reader::HttpMediaReader, supabase::SupabaseStorage};
use use_cases::{gestures::GestureHandler, profile::ProfileHandler};

pub type AppGestureHandler = GestureHandler<Arc<dyn GestureRepository>>;
pub type AppProfileHandler = ProfileHandler<Arc<dyn ProfileRepository>>;

/// Collaborators behind the application's trait seams.
pub struct AppServices {
    pub gesture_repo: Arc<dyn GestureRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub object_store: Arc<dyn ObjectStore>,
    pub media_reader: Arc<dyn MediaReader>,
    pub blobs: Arc<dyn BlobRegistry>,
    pub session_verifier: Arc<dyn SessionVerifier>,
}

pub struct AppState {
    pub gesture_handler: AppGestureHandler,
    pub profile_handler: AppProfileHandler,
    pub blobs: Arc<dyn BlobRegistry>,
    pub session_verifier: Arc<dyn SessionVerifier>,
    pub max_image_bytes: usize,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: &settings::AppConfig, pool: sqlx::PgPool, shutdown: CancellationToken) -> Result<Self, AppError> {
        let object_store = SupabaseStorage::new(config)
            .map_err(|e| AppError::InternalError(format!("Storage client setup failed: {e}")))?;
        let media_reader = HttpMediaReader::new(config)
            .map_err(|e| AppError::InternalError(format!("Media reader setup failed: {e}")))?;

        let services = AppServices {
            gesture_repo: Arc::new(SqlxGestureRepo::new(pool.clone())),
            profile_repo: Arc::new(SqlxProfileRepo::new(pool)),
            object_store: Arc::new(object_store),
            media_reader: Arc::new(media_reader),
            blobs: Arc::new(InMemoryBlobRegistry::new()),
            session_verifier: Arc::new(JwtService::new(config)),
        };

        Ok(Self::with_services(config, services, shutdown))
    }

    pub fn with_services(config: &settings::AppConfig, services: AppServices, shutdown: CancellationToken) -> Self {
        let pipeline = Arc::new(ImagePipeline::new(
            ImageMaterializer::new(services.media_reader, services.blobs.clone(), config.max_image_bytes),
            ImageUploader::new(services.object_store, &config.avatar_bucket, &config.gesture_bucket),
        ));

        AppState {
            gesture_handler: GestureHandler::new(services.gesture_repo, pipeline.clone()),
            profile_handler: ProfileHandler::new(services.profile_repo, pipeline),
            blobs: services.blobs,
            session_verifier: services.session_verifier,
            max_image_bytes: config.max_image_bytes,
            shutdown,
        }
    }

    /// Token for one request. Cancelled when the process starts shutting down.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
