use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub catalog: CatalogConfig,
    pub recommendation: RecommendationConfig,
    pub session: SessionConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,
    #[serde(default = "default_min_recommendations")]
    pub min_recommendations: usize,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    /// Unset selects the log-only sink
    pub feedback_sheet_id: Option<String>,
    #[serde(default = "default_sheet_range")]
    pub feedback_sheet_range: String,
    #[serde(default = "default_api_base")]
    pub feedback_api_base: String,
    pub feedback_api_token: Option<String>,
    #[serde(default = "default_feedback_timeout_ms")]
    pub feedback_timeout_ms: u64,
    #[serde(default = "default_schema_version")]
    pub feedback_schema_version: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let config = Config {
            service: envy::from_env()?,
            catalog: envy::from_env()?,
            recommendation: envy::from_env()?,
            session: envy::from_env()?,
            feedback: envy::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from explicit key/value pairs instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        let config = Config {
            service: envy::from_iter(vars.clone())?,
            catalog: envy::from_iter(vars.clone())?,
            recommendation: envy::from_iter(vars.clone())?,
            session: envy::from_iter(vars.clone())?,
            feedback: envy::from_iter(vars)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rec = &self.recommendation;
        if rec.min_recommendations > rec.max_recommendations {
            return Err(ConfigError::Invalid(format!(
                "MIN_RECOMMENDATIONS ({}) exceeds MAX_RECOMMENDATIONS ({})",
                rec.min_recommendations, rec.max_recommendations
            )));
        }
        if !(rec.min_recommendations..=rec.max_recommendations)
            .contains(&rec.default_recommendations)
        {
            return Err(ConfigError::Invalid(format!(
                "DEFAULT_RECOMMENDATIONS ({}) must lie in [{}, {}]",
                rec.default_recommendations, rec.min_recommendations, rec.max_recommendations
            )));
        }
        if self.feedback.feedback_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "FEEDBACK_TIMEOUT_MS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl FeedbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("./data/model.json")
}

fn default_recommendations() -> usize {
    10
}

fn default_min_recommendations() -> usize {
    5
}

fn default_max_recommendations() -> usize {
    20
}

fn default_session_ttl_secs() -> u64 {
    7200 // 2 hours
}

fn default_sheet_range() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_feedback_timeout_ms() -> u64 {
    5000
}

fn default_schema_version() -> String {
    "v2.0".to_string()
}
