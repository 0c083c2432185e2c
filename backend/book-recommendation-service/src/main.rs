use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_recommendation_service::config::Config;
use book_recommendation_service::handlers::{configure, AppState};
use book_recommendation_service::metrics;
use book_recommendation_service::services::catalog::CatalogStore;
use book_recommendation_service::services::feedback::{
    FeedbackService, FeedbackSink, LogFeedbackSink, SheetsFeedbackSink,
};
use book_recommendation_service::services::recommender::RecommendationService;
use book_recommendation_service::services::scoring::load_model;
use book_recommendation_service::services::session::SessionStore;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!(
        "Starting book-recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.service.app_env);

    // Catalog and model must agree before anything is served
    let catalog = CatalogStore::load_from_dir(&config.catalog.catalog_dir)
        .context("Failed to load catalog")?;
    let model = load_model(&config.catalog.model_path, catalog.vocabulary().len())
        .context("Failed to load scoring model")?;

    let recommender = RecommendationService::new(
        Arc::new(catalog),
        model,
        config.recommendation.clone(),
    )
    .context("Catalog and model disagree")?;

    let sink: Arc<dyn FeedbackSink> = match SheetsFeedbackSink::from_config(&config.feedback) {
        Some(sink) => Arc::new(sink),
        None => {
            tracing::warn!("FEEDBACK_SHEET_ID not set; feedback goes to the log only");
            Arc::new(LogFeedbackSink)
        }
    };
    let feedback = FeedbackService::new(
        sink,
        config.feedback.timeout(),
        config.feedback.feedback_schema_version.clone(),
    );
    tracing::info!(sink = feedback.sink_name(), "Feedback sink configured");

    let sessions = Arc::new(SessionStore::new(config.session.ttl()));

    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            metrics::SESSIONS_ACTIVE.set(sweeper.len() as i64);
            if purged > 0 {
                tracing::debug!(purged, remaining = sweeper.len(), "Expired sessions purged");
            }
        }
    });

    let state = web::Data::new(AppState {
        recommender: Arc::new(recommender),
        sessions,
        feedback: Arc::new(feedback),
    });

    let bind_addr = config.bind_addr();
    tracing::info!("Listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
