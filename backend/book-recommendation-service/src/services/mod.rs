//! Recommendation pipeline components
//!
//! catalog → features → scoring → ranking are wired together by
//! `recommender`; `session` and `feedback` back the interactive page.

pub mod catalog;
pub mod features;
pub mod feedback;
pub mod ranking;
pub mod recommender;
pub mod scoring;
pub mod session;

pub use catalog::{CatalogError, CatalogStore, FeatureVocabulary, IndexMapping};
pub use features::{EncodedFeatures, FeatureEncoder};
pub use feedback::{
    FeedbackService, FeedbackSink, FeedbackSubmission, LogFeedbackSink, SheetsFeedbackSink,
    SinkError,
};
pub use ranking::RankingError;
pub use recommender::{RecommendationService, Recommendations};
pub use scoring::{load_model, FactorizationModel, OnnxScoringModel, ScoringEngine, ScoringError};
pub use session::{SessionError, SessionState, SessionStore, SessionView};
