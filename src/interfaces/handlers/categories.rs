use actix_web::{get, HttpResponse, Responder};

use crate::entities::category::{Category, CategoryResponse};

#[get("/categories")]
pub async fn list_categories() -> impl Responder {
    let categories: Vec<CategoryResponse> = Category::ALL.into_iter().map(CategoryResponse::from).collect();
    HttpResponse::Ok().json(categories)
}
