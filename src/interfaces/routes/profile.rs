use actix_web::web;

use crate::handlers::profile;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .service(
                web::resource("")
                    .route(web::get().to(profile::get_profile))
                    .route(web::put().to(profile::update_profile))
            )
            .service(
                web::resource("/avatar")
                    .route(web::post().to(profile::upload_avatar))
                    .route(web::delete().to(profile::remove_avatar))
            )
    );
}
