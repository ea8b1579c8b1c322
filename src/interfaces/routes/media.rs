use actix_web::web;

use crate::handlers::{blobs, uploads};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/blobs")
            .route(web::post().to(blobs::stage_blob))
    )
    .service(
        web::resource("/uploads/{purpose}")
            .route(web::post().to(uploads::upload_image))
    );
}
