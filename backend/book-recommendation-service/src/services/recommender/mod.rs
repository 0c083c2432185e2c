/// Recommendation pipeline
///
/// selection → FeatureEncoder → ScoringEngine → Ranker → catalog keys
///
/// Holds only process-wide, read-only pieces, so one instance serves every
/// session concurrently.
use crate::config::RecommendationConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{BookCard, BookDetail};
use crate::services::catalog::CatalogStore;
use crate::services::features::FeatureEncoder;
use crate::services::ranking;
use crate::services::scoring::ScoringEngine;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, error};

/// Selection size the form suggests; not enforced.
pub const ADVISED_SELECTION: RangeInclusive<usize> = 1..=3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendations {
    pub isbns: Vec<String>,
    pub dropped_authors: Vec<String>,
    pub selection_hint: Option<String>,
}

pub struct RecommendationService {
    catalog: Arc<CatalogStore>,
    encoder: FeatureEncoder,
    model: Arc<dyn ScoringEngine>,
    limits: RecommendationConfig,
}

impl RecommendationService {
    /// Wire the pipeline; fails if the model and catalog disagree on shape or
    /// the catalog cannot satisfy the default and minimum counts.
    pub fn new(
        catalog: Arc<CatalogStore>,
        model: Arc<dyn ScoringEngine>,
        limits: RecommendationConfig,
    ) -> Result<Self> {
        catalog.check_model_dimensions(model.n_features(), model.n_items())?;

        let items = catalog.item_count();
        if limits.min_recommendations > items || limits.default_recommendations > items {
            return Err(AppError::StartupInconsistency(format!(
                "catalog holds {} items but MIN_RECOMMENDATIONS={} and DEFAULT_RECOMMENDATIONS={}",
                items, limits.min_recommendations, limits.default_recommendations
            )));
        }

        let encoder = FeatureEncoder::new(Arc::new(catalog.vocabulary().clone()));
        Ok(Self {
            catalog,
            encoder,
            model,
            limits,
        })
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn limits(&self) -> &RecommendationConfig {
        &self.limits
    }

    /// Resolve an optional request count against the configured bounds.
    pub fn resolve_count(&self, requested: Option<usize>) -> Result<usize> {
        let k = requested.unwrap_or(self.limits.default_recommendations);
        let bounds = self.limits.min_recommendations..=self.limits.max_recommendations;
        if !bounds.contains(&k) {
            return Err(AppError::OutOfRange(format!(
                "count {} outside [{}, {}]",
                k,
                bounds.start(),
                bounds.end()
            )));
        }
        if k > self.catalog.item_count() {
            return Err(AppError::OutOfRange(format!(
                "count {} exceeds catalog size {}",
                k,
                self.catalog.item_count()
            )));
        }
        Ok(k)
    }

    /// Top-`k` books for a cold-start user described by `selection`.
    pub fn recommend(&self, selection: &BTreeSet<String>, k: Option<usize>) -> Result<Recommendations> {
        let k = self.resolve_count(k).map_err(|e| {
            metrics::RECOMMENDATIONS_TOTAL
                .with_label_values(&["out_of_range"])
                .inc();
            e
        })?;

        let encoded = self.encoder.encode(selection);

        let timer = metrics::SCORING_DURATION_SECONDS.start_timer();
        let scores = self.model.predict_all(encoded.vector.view());
        timer.observe_duration();

        let scores = scores.map_err(|e| {
            error!(error = %e, backend = self.model.backend(), "Scoring failed");
            metrics::RECOMMENDATIONS_TOTAL
                .with_label_values(&["scoring_error"])
                .inc();
            AppError::from(e)
        })?;

        let scores = scores.to_vec();
        let isbns = ranking::rank(&scores, k, self.catalog.items())?;

        metrics::RECOMMENDATIONS_TOTAL
            .with_label_values(&["success"])
            .inc();
        debug!(
            selected = selection.len(),
            active_features = encoded.active_count(),
            dropped = encoded.dropped.len(),
            k,
            "Recommendations generated"
        );

        Ok(Recommendations {
            isbns,
            dropped_authors: encoded.dropped,
            selection_hint: selection_hint(selection.len()),
        })
    }

    pub fn cards(&self, isbns: &[String]) -> Result<Vec<BookCard>> {
        isbns
            .iter()
            .map(|isbn| Ok(BookCard::from(self.catalog.book(isbn)?)))
            .collect()
    }

    pub fn detail(&self, isbn: &str) -> Result<BookDetail> {
        Ok(BookDetail::from(self.catalog.book(isbn)?))
    }
}

fn selection_hint(selected: usize) -> Option<String> {
    if ADVISED_SELECTION.contains(&selected) {
        None
    } else {
        Some(format!(
            "Please select {} to {} authors for the best results",
            ADVISED_SELECTION.start(),
            ADVISED_SELECTION.end()
        ))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::services::catalog::fixtures::catalog;
    use crate::services::scoring::factorization::fixtures::model;

    pub fn limits(min: usize, max: usize, default: usize) -> RecommendationConfig {
        RecommendationConfig {
            default_recommendations: default,
            min_recommendations: min,
            max_recommendations: max,
        }
    }

    /// Six-book pipeline accepting 1..=6 recommendations, default 3
    pub fn service() -> RecommendationService {
        RecommendationService::new(Arc::new(catalog()), Arc::new(model()), limits(1, 6, 3))
            .unwrap()
    }
}
