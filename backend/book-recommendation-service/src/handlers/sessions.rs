use super::AppState;
use crate::error::Result;
use crate::models::{BookCard, BookDetail};
use crate::services::feedback::FeedbackSubmission;
use crate::services::recommender::RecommendationService;
use crate::services::session::{SessionError, SessionState, SessionView};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Session as the page renders it: keys resolved into cards and detail
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: &'static str,
    pub selection: Vec<String>,
    pub recommendations: Vec<BookCard>,
    pub detail: Option<BookDetail>,
    pub feedback_submitted: bool,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    fn build(id: Uuid, session: &SessionState, recommender: &RecommendationService) -> Result<Self> {
        let state = match session.view() {
            SessionView::Idle => "idle",
            SessionView::Recommending { .. } => "recommending",
            SessionView::DetailOpen { .. } => "detail_open",
        };
        let detail = session
            .open_item()
            .map(|isbn| recommender.detail(isbn))
            .transpose()?;

        Ok(Self {
            session_id: id,
            state,
            selection: session.selection().iter().cloned().collect(),
            recommendations: recommender.cards(session.recommendations())?,
            detail,
            feedback_submitted: session.feedback_submitted(),
            updated_at: session.updated_at(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    pub authors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub dropped_authors: Vec<String>,
    pub selection_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenDetailRequest {
    pub isbn: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackAccepted {
    pub session_id: Uuid,
    pub rating: u8,
    pub schema_version: String,
    pub message: &'static str,
}

/// POST /api/v1/sessions
#[post("/sessions")]
pub async fn create_session(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (id, session) = state.sessions.create();
    let snapshot = SessionSnapshot::build(id, &session, &state.recommender)?;
    Ok(HttpResponse::Created().json(snapshot))
}

/// GET /api/v1/sessions/{id}
#[get("/sessions/{id}")]
pub async fn get_session(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<web::Json<SessionSnapshot>> {
    let id = id.into_inner();
    let session = state.sessions.get(id)?;
    Ok(web::Json(SessionSnapshot::build(id, &session, &state.recommender)?))
}

/// PUT /api/v1/sessions/{id}/preferences
#[put("/sessions/{id}/preferences")]
pub async fn save_preferences(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<PreferencesRequest>,
) -> Result<web::Json<SessionSnapshot>> {
    let id = id.into_inner();
    let session = state.sessions.apply(id, |s| {
        let next = s.with_selection(&body.authors);
        Ok::<_, crate::error::AppError>((next.clone(), next))
    })?;
    Ok(web::Json(SessionSnapshot::build(id, &session, &state.recommender)?))
}

/// POST /api/v1/sessions/{id}/recommendations
#[post("/sessions/{id}/recommendations")]
pub async fn generate_recommendations(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: Option<web::Json<GenerateRequest>>,
) -> Result<web::Json<GenerateResponse>> {
    let id = id.into_inner();
    let count = body.and_then(|b| b.count);
    let recommender = &state.recommender;

    let (session, recs) = state.sessions.apply(id, |s| {
        let recs = recommender.recommend(s.selection(), count)?;
        let next = s.with_recommendations(recs.isbns.clone());
        Ok::<_, crate::error::AppError>((next.clone(), (next, recs)))
    })?;

    info!(
        session_id = %id,
        selected = session.selection().len(),
        k = recs.isbns.len(),
        dropped = recs.dropped_authors.len(),
        "Recommendations served"
    );

    Ok(web::Json(GenerateResponse {
        session: SessionSnapshot::build(id, &session, recommender)?,
        dropped_authors: recs.dropped_authors,
        selection_hint: recs.selection_hint,
    }))
}

/// POST /api/v1/sessions/{id}/detail
#[post("/sessions/{id}/detail")]
pub async fn open_detail(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<OpenDetailRequest>,
) -> Result<web::Json<SessionSnapshot>> {
    let id = id.into_inner();
    let session = state.sessions.apply(id, |s| {
        let next = s.open_detail(&body.isbn)?;
        Ok::<_, crate::error::AppError>((next.clone(), next))
    })?;
    Ok(web::Json(SessionSnapshot::build(id, &session, &state.recommender)?))
}

/// DELETE /api/v1/sessions/{id}/detail
#[delete("/sessions/{id}/detail")]
pub async fn close_detail(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<web::Json<SessionSnapshot>> {
    let id = id.into_inner();
    let session = state.sessions.apply(id, |s| {
        let next = s.close_detail()?;
        Ok::<_, crate::error::AppError>((next.clone(), next))
    })?;
    Ok(web::Json(SessionSnapshot::build(id, &session, &state.recommender)?))
}

/// POST /api/v1/sessions/{id}/feedback
///
/// The session must exist; its recommendation list is never touched here.
/// Once the row is appended the request succeeds, even if the session
/// expired while the sink was busy.
#[post("/sessions/{id}/feedback")]
pub async fn submit_feedback(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<FeedbackSubmission>,
) -> Result<web::Json<FeedbackAccepted>> {
    let id = id.into_inner();
    state.sessions.get(id)?;

    let record = state.feedback.submit(&body).await?;
    if let Err(e) = state.sessions.apply(id, |s| {
        Ok::<_, SessionError>((s.with_feedback_submitted(), ()))
    }) {
        warn!(session_id = %id, error = %e, "Feedback saved but session flag not set");
    }

    Ok(web::Json(FeedbackAccepted {
        session_id: id,
        rating: record.rating,
        schema_version: record.schema_version,
        message: "Thank you for your feedback!",
    }))
}
