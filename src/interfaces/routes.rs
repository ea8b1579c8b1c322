use actix_web::web;

use crate::handlers::{
    categories::list_categories, home::home, json_error::not_found, system::health_check,
};

mod gestures;
mod json_error;
mod media;
mod profile;

pub use json_error::body_limits;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);

    cfg.service(
        web::scope("/api/v1")
            .service(health_check)
            .service(list_categories)
            .configure(media::config_routes)
            .configure(gestures::config_routes)
            .configure(profile::config_routes)
    );

    cfg.default_service(web::route().to(not_found));
}
