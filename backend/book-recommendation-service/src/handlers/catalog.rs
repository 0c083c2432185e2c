use super::AppState;
use crate::error::Result;
use crate::models::BookDetail;
use actix_web::{get, web, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AuthorOptions {
    pub quick_picks: Vec<String>,
    pub all: Vec<String>,
}

/// GET /api/v1/authors
#[get("/authors")]
pub async fn list_authors(state: web::Data<AppState>) -> HttpResponse {
    let catalog = state.recommender.catalog();
    HttpResponse::Ok().json(AuthorOptions {
        quick_picks: catalog.quick_pick_authors(),
        all: catalog.vocabulary().authors(),
    })
}

/// GET /api/v1/books/{isbn}
#[get("/books/{isbn}")]
pub async fn get_book(
    state: web::Data<AppState>,
    isbn: web::Path<String>,
) -> Result<web::Json<BookDetail>> {
    Ok(web::Json(state.recommender.detail(&isbn)?))
}
