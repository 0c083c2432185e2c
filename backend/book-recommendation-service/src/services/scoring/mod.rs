/// Scoring Engine
///
/// The pre-trained model sits behind [`ScoringEngine`]: one cold-start user
/// feature vector in, one relevance score per requested item index out.
/// Implementations are loaded once and shared read-only by every session.
///
/// # Backends
/// - **factorization**: hybrid matrix-factorization weights exported as JSON
/// - **onnx**: an exported graph run with tract-onnx
pub mod factorization;
pub mod onnx;

pub use factorization::FactorizationModel;
pub use onnx::OnnxScoringModel;

use ndarray::{Array1, ArrayView1};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Model loading failed: {0}")]
    ModelLoadError(String),

    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),

    #[error("Expected {expected} user features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Item index {index} outside model range 0..{n_items}")]
    UnknownItem { index: usize, n_items: usize },

    #[error("Model inference failed: {0}")]
    InferenceError(String),
}

pub type Result<T> = std::result::Result<T, ScoringError>;

pub trait ScoringEngine: Send + Sync {
    /// Width of the user feature space
    fn n_features(&self) -> usize;

    /// Number of scoreable items
    fn n_items(&self) -> usize;

    fn backend(&self) -> &'static str;

    /// Score `item_ids` for one user; output follows the order of `item_ids`.
    fn predict(&self, user_features: ArrayView1<'_, f32>, item_ids: &[usize]) -> Result<Array1<f32>>;

    /// Score every item `0..n_items`.
    fn predict_all(&self, user_features: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        let item_ids: Vec<usize> = (0..self.n_items()).collect();
        self.predict(user_features, &item_ids)
    }
}

/// Load the artifact at `path`; `.onnx` selects the tract backend.
///
/// `n_features` is the vocabulary width, needed to pin the ONNX input shape.
pub fn load_model(path: &Path, n_features: usize) -> Result<Arc<dyn ScoringEngine>> {
    let is_onnx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false);

    let model: Arc<dyn ScoringEngine> = if is_onnx {
        Arc::new(OnnxScoringModel::load(path, n_features)?)
    } else {
        Arc::new(FactorizationModel::load(path)?)
    };

    info!(
        backend = model.backend(),
        n_features = model.n_features(),
        n_items = model.n_items(),
        "Scoring model loaded from {}",
        path.display()
    );
    Ok(model)
}

pub(crate) fn check_request(
    user_features: &ArrayView1<'_, f32>,
    item_ids: &[usize],
    n_features: usize,
    n_items: usize,
) -> Result<()> {
    if user_features.len() != n_features {
        return Err(ScoringError::DimensionMismatch {
            expected: n_features,
            actual: user_features.len(),
        });
    }
    if let Some(&index) = item_ids.iter().find(|&&i| i >= n_items) {
        return Err(ScoringError::UnknownItem { index, n_items });
    }
    Ok(())
}
