use actix_web::web;

use crate::handlers::gestures;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gestures")
            .service(
                web::resource("")
                    .route(web::post().to(gestures::create_gesture))
                    .route(web::get().to(gestures::list_gestures))
            )
            .service(
                web::resource("/search")
                    .route(web::get().to(gestures::search_gestures))
            )
            .service(
                web::resource("/counts")
                    .route(web::get().to(gestures::count_by_category))
            )
            .service(
                web::resource("/category/{category}")
                    .route(web::get().to(gestures::list_by_category))
            )
            .service(
                web::resource("/{gesture_id}")
                    .route(web::get().to(gestures::get_gesture))
                    .route(web::put().to(gestures::update_gesture))
                    .route(web::delete().to(gestures::delete_gesture))
            )
    );
}
