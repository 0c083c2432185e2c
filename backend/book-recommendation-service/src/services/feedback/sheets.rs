/// Spreadsheet feedback sink
///
/// Appends one row per record through the sheet values `append` endpoint:
/// `POST {base}/spreadsheets/{id}/values/{range}:append?valueInputOption=USER_ENTERED`
use super::{FeedbackSink, SinkError};
use crate::config::FeedbackConfig;
use crate::models::FeedbackRecord;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::json;
use tracing::debug;

pub struct SheetsFeedbackSink {
    http: HttpClient,
    append_url: String,
    token: Option<String>,
}

impl SheetsFeedbackSink {
    pub fn new(api_base: &str, sheet_id: &str, range: &str, token: Option<String>) -> Self {
        let append_url = format!(
            "{}/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            api_base.trim_end_matches('/'),
            sheet_id,
            range
        );
        Self {
            http: HttpClient::new(),
            append_url,
            token,
        }
    }

    /// `None` when no sheet id is configured.
    pub fn from_config(config: &FeedbackConfig) -> Option<Self> {
        config.feedback_sheet_id.as_deref().map(|sheet_id| {
            Self::new(
                &config.feedback_api_base,
                sheet_id,
                &config.feedback_sheet_range,
                config.feedback_api_token.clone(),
            )
        })
    }

    pub fn append_url(&self) -> &str {
        &self.append_url
    }
}

#[async_trait]
impl FeedbackSink for SheetsFeedbackSink {
    async fn append_row(&self, record: &FeedbackRecord) -> Result<(), SinkError> {
        let body = json!({ "values": [record.to_row()] });

        let mut request = self.http.post(&self.append_url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Connectivity(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Feedback row appended");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SinkError::Unauthorized(format!("{}: {}", status, message)))
            }
            _ => Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_append_url() {
        let sink = SheetsFeedbackSink::new("https://sheets.example/v4/", "abc123", "Sheet1", None);
        assert_eq!(
            sink.append_url(),
            "https://sheets.example/v4/spreadsheets/abc123/values/Sheet1:append?valueInputOption=USER_ENTERED"
        );
    }

    #[test]
    fn test_unconfigured_sheet_yields_none() {
        let config = FeedbackConfig {
            feedback_sheet_id: None,
            feedback_sheet_range: "Sheet1".to_string(),
            feedback_api_base: "https://sheets.example/v4".to_string(),
            feedback_api_token: None,
            feedback_timeout_ms: 1000,
            feedback_schema_version: "v2.0".to_string(),
        };
        assert!(SheetsFeedbackSink::from_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connectivity_error() {
        // port 9 (discard) on localhost is closed in test environments
        let sink = SheetsFeedbackSink::new("http://127.0.0.1:9", "sheet", "Sheet1", None);
        let record = FeedbackRecord {
            timestamp: Utc::now(),
            identity: "anonymous".to_string(),
            rating: 4,
            comment: String::new(),
            schema_version: "v2.0".to_string(),
        };
        let result = sink.append_row(&record).await;
        assert!(matches!(result, Err(SinkError::Connectivity(_))));
    }
}
