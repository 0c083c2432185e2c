// ============================================
// Feedback Handler
// ============================================
//
// Validates a satisfaction submission, turns it into a timestamped,
// versioned record and appends it to the external feedback sheet.
//
// - Rating labels map to 5..1 by exact match; anything else is rejected
//   before a record is built.
// - An empty identity is stored as "anonymous".
// - The sink call runs under a bounded timeout; timeouts, connectivity and
//   auth failures all surface as a non-fatal FeedbackSink error. Nothing is
//   retried.

pub mod sheets;

pub use sheets::SheetsFeedbackSink;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{FeedbackRecord, Rating};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const ANONYMOUS_IDENTITY: &str = "anonymous";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("feedback store unreachable: {0}")]
    Connectivity(String),

    #[error("feedback store refused credentials: {0}")]
    Unauthorized(String),

    #[error("feedback store rejected the row ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("feedback store did not answer within {0:?}")]
    Timeout(Duration),
}

/// Append-only destination for feedback rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn append_row(&self, record: &FeedbackRecord) -> std::result::Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// Writes feedback to the log only; used when no sheet is configured.
pub struct LogFeedbackSink;

#[async_trait]
impl FeedbackSink for LogFeedbackSink {
    async fn append_row(&self, record: &FeedbackRecord) -> std::result::Result<(), SinkError> {
        info!(
            rating = record.rating,
            schema_version = %record.schema_version,
            anonymous = record.identity == ANONYMOUS_IDENTITY,
            "Feedback recorded (log sink)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Raw form input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub identity: Option<String>,
    pub rating: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Validate `submission` and build the record to append.
pub fn build_record(
    submission: &FeedbackSubmission,
    schema_version: &str,
    now: DateTime<Utc>,
) -> Result<FeedbackRecord> {
    let rating = Rating::from_label(&submission.rating).ok_or_else(|| {
        AppError::Validation(format!("unrecognized rating '{}'", submission.rating))
    })?;

    let identity = submission
        .identity
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_IDENTITY)
        .to_string();

    Ok(FeedbackRecord {
        timestamp: now,
        identity,
        rating: rating.score(),
        comment: submission.comment.clone().unwrap_or_default(),
        schema_version: schema_version.to_string(),
    })
}

pub struct FeedbackService {
    sink: Arc<dyn FeedbackSink>,
    timeout: Duration,
    schema_version: String,
}

impl FeedbackService {
    pub fn new(sink: Arc<dyn FeedbackSink>, timeout: Duration, schema_version: String) -> Self {
        Self {
            sink,
            timeout,
            schema_version,
        }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    pub async fn submit(&self, submission: &FeedbackSubmission) -> Result<FeedbackRecord> {
        let record = build_record(submission, &self.schema_version, Utc::now()).map_err(|e| {
            metrics::FEEDBACK_TOTAL.with_label_values(&["invalid"]).inc();
            e
        })?;

        let outcome = match tokio::time::timeout(self.timeout, self.sink.append_row(&record)).await
        {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(()) => {
                metrics::FEEDBACK_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    sink = self.sink.name(),
                    rating = record.rating,
                    anonymous = record.identity == ANONYMOUS_IDENTITY,
                    "Feedback saved"
                );
                Ok(record)
            }
            Err(e) => {
                metrics::FEEDBACK_TOTAL.with_label_values(&["sink_error"]).inc();
                warn!(sink = self.sink.name(), error = %e, "Failed to save feedback");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(identity: Option<&str>, rating: &str) -> FeedbackSubmission {
        FeedbackSubmission {
            identity: identity.map(str::to_string),
            rating: rating.to_string(),
            comment: Some("More mysteries please".to_string()),
        }
    }

    #[test]
    fn test_bad_label_maps_to_two() {
        let record =
            build_record(&submission(Some("a@b.c"), "Bad. Not what I wanted"), "v2.0", Utc::now())
                .unwrap();
        assert_eq!(record.rating, 2);
        assert_eq!(record.identity, "a@b.c");
        assert_eq!(record.schema_version, "v2.0");
    }

    #[test]
    fn test_empty_identity_becomes_anonymous() {
        for identity in [None, Some(""), Some("   ")] {
            let record =
                build_record(&submission(identity, "Good! Mostly relevant"), "v2.0", Utc::now())
                    .unwrap();
            assert_eq!(record.identity, ANONYMOUS_IDENTITY);
            assert_eq!(record.rating, 4);
        }
    }

    #[test]
    fn test_unknown_label_is_validation_error() {
        let result = build_record(&submission(None, "Meh"), "v2.0", Utc::now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_missing_comment_is_empty_string() {
        let mut s = submission(None, "Fair. Got some good suggestions");
        s.comment = None;
        let record = build_record(&s, "v2.0", Utc::now()).unwrap();
        assert_eq!(record.comment, "");
        assert_eq!(record.rating, 3);
    }

    #[tokio::test]
    async fn test_submit_appends_once() {
        let mut sink = MockFeedbackSink::new();
        sink.expect_append_row()
            .withf(|r| r.rating == 5 && r.identity == ANONYMOUS_IDENTITY)
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_name().return_const("mock");

        let service = FeedbackService::new(
            Arc::new(sink),
            Duration::from_secs(1),
            "v2.0".to_string(),
        );
        let record = service
            .submit(&submission(None, "Excellent! Perfect matches!"))
            .await
            .unwrap();
        assert_eq!(record.rating, 5);
    }

    #[tokio::test]
    async fn test_invalid_label_never_reaches_sink() {
        let mut sink = MockFeedbackSink::new();
        sink.expect_append_row().times(0);
        sink.expect_name().return_const("mock");

        let service = FeedbackService::new(
            Arc::new(sink),
            Duration::from_secs(1),
            "v2.0".to_string(),
        );
        let result = service.submit(&submission(None, "Excellent")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_connectivity_failure_is_reported() {
        let mut sink = MockFeedbackSink::new();
        sink.expect_append_row()
            .times(1)
            .returning(|_| Err(SinkError::Connectivity("connection refused".to_string())));
        sink.expect_name().return_const("mock");

        let service = FeedbackService::new(
            Arc::new(sink),
            Duration::from_secs(1),
            "v2.0".to_string(),
        );
        let result = service
            .submit(&submission(None, "Horrible. Completely off"))
            .await;
        assert!(matches!(result, Err(AppError::FeedbackSink(_))));
    }

    struct SlowSink;

    #[async_trait]
    impl FeedbackSink for SlowSink {
        async fn append_row(&self, _record: &FeedbackRecord) -> std::result::Result<(), SinkError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_slow_sink_times_out() {
        let service = FeedbackService::new(
            Arc::new(SlowSink),
            Duration::from_millis(20),
            "v2.0".to_string(),
        );
        let err = service
            .submit(&submission(None, "Good! Mostly relevant"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FeedbackSink(_)));
        assert!(err.to_string().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_rows() {
        let service = FeedbackService::new(
            Arc::new(LogFeedbackSink),
            Duration::from_secs(1),
            "v2.0".to_string(),
        );
        assert_eq!(service.sink_name(), "log");
        assert!(service
            .submit(&submission(Some("reader"), "Fair. Got some good suggestions"))
            .await
            .is_ok());
    }
}
