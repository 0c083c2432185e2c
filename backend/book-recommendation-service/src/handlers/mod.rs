pub mod catalog;
pub mod sessions;

use crate::metrics;
use crate::services::feedback::FeedbackService;
use crate::services::recommender::RecommendationService;
use crate::services::session::SessionStore;
use actix_web::{web, HttpResponse};
use std::sync::Arc;

pub use catalog::{get_book, list_authors, AuthorOptions};
pub use sessions::{
    close_detail, create_session, generate_recommendations, get_session, open_detail,
    save_preferences, submit_feedback, SessionSnapshot,
};

/// Shared, process-wide handler state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RecommendationService>,
    pub sessions: Arc<SessionStore>,
    pub feedback: Arc<FeedbackService>,
}

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_handler))
        .route("/health", web::get().to(|| async { "OK" }))
        .route("/metrics", web::get().to(metrics_handler))
        .service(
            web::scope("/api/v1")
                .service(list_authors)
                .service(get_book)
                .service(create_session)
                .service(get_session)
                .service(save_preferences)
                .service(generate_recommendations)
                .service(open_detail)
                .service(close_detail)
                .service(submit_feedback),
        );
}

/// Single-page UI
async fn index_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../../static/index.html"))
}

async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    metrics::SESSIONS_ACTIVE.set(state.sessions.len() as i64);
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::gather_metrics())
}


#[cfg(test)]
mod tests {
    use super::fixtures::app_state;
    use super::*;
    use crate::services::feedback::LogFeedbackSink;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_and_index() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(Arc::new(LogFeedbackSink))))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains("<html"));
        // Esc closes the dialog without the button; the server must still hear about it
        assert!(page.contains(r#"getElementById("detail").addEventListener("close""#));
    }

    #[actix_web::test]
    async fn test_metrics_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(Arc::new(LogFeedbackSink))))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("book_rec_sessions_active"));
    }
}
