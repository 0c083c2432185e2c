/// Prometheus metrics for the book recommendation service
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Encoder, Histogram,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Recommendation generations (labels: status=success|out_of_range|scoring_error)
    pub static ref RECOMMENDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "book_rec_recommendations_total",
        "Total number of recommendation generations",
        &["status"]
    )
    .unwrap();

    /// Feedback submissions (labels: status=success|invalid|sink_error)
    pub static ref FEEDBACK_TOTAL: IntCounterVec = register_int_counter_vec!(
        "book_rec_feedback_total",
        "Total number of feedback submissions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "book_rec_sessions_active",
        "Sessions currently held in memory"
    )
    .unwrap();

    /// Scoring engine latency in seconds
    pub static ref SCORING_DURATION_SECONDS: Histogram = register_histogram!(
        "book_rec_scoring_duration_seconds",
        "Time spent scoring the catalog for one request",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();
}

/// Render every registered metric in the text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
