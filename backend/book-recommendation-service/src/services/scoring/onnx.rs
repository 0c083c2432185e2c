/// ONNX scoring backend
///
/// Runs an exported scoring graph with tract-onnx. The graph takes a
/// `[1, n_features]` f32 user feature tensor and returns scores for every
/// item, shaped `[1, n_items]` or `[n_items]`.
use super::{check_request, Result, ScoringEngine, ScoringError};
use ndarray::{Array1, ArrayView1};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Inference slower than this is logged
const SLOW_INFERENCE_MS: u128 = 100;

pub struct OnnxScoringModel {
    plan: Arc<OnnxPlan>,
    n_features: usize,
    n_items: usize,
}

impl OnnxScoringModel {
    /// Load, optimize and probe the graph to learn how many items it scores.
    pub fn load(path: &Path, n_features: usize) -> Result<Self> {
        if !path.exists() {
            return Err(ScoringError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                ScoringError::ModelLoadError(format!("{}: {}", path.display(), e))
            })?;

        let mut model = Self {
            plan: Arc::new(plan),
            n_features,
            n_items: 0,
        };

        let probe = Array1::<f32>::zeros(n_features);
        model.n_items = model.run(probe.view())?.len();
        if model.n_items == 0 {
            return Err(ScoringError::InvalidModel(
                "ONNX graph produced no scores".to_string(),
            ));
        }

        debug!(
            n_features = model.n_features,
            n_items = model.n_items,
            "ONNX scoring graph ready: {}",
            path.display()
        );
        Ok(model)
    }

    /// Score every item for one user.
    fn run(&self, user_features: ArrayView1<'_, f32>) -> Result<Vec<f32>> {
        let start = Instant::now();

        let input: Tensor = tract_ndarray::Array2::from_shape_vec(
            (1, self.n_features),
            user_features.iter().copied().collect(),
        )
        .map_err(|e| ScoringError::InferenceError(format!("Input shaping failed: {}", e)))?
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ScoringError::InferenceError(format!("ONNX inference failed: {}", e)))?;

        let output = outputs.first().ok_or_else(|| {
            ScoringError::InferenceError("ONNX graph returned no outputs".to_string())
        })?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| ScoringError::InferenceError(format!("Output extraction failed: {}", e)))?
            .iter()
            .copied()
            .collect();

        let elapsed_ms = start.elapsed().as_millis();
        if elapsed_ms > SLOW_INFERENCE_MS {
            warn!(elapsed_ms, "Slow ONNX inference");
        }

        Ok(scores)
    }
}

impl ScoringEngine for OnnxScoringModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_items(&self) -> usize {
        self.n_items
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, user_features: ArrayView1<'_, f32>, item_ids: &[usize]) -> Result<Array1<f32>> {
        check_request(&user_features, item_ids, self.n_features, self.n_items)?;

        let all = self.run(user_features)?;
        if all.len() != self.n_items {
            return Err(ScoringError::InferenceError(format!(
                "ONNX graph returned {} scores, expected {}",
                all.len(),
                self.n_items
            )));
        }

        Ok(item_ids.iter().map(|&i| all[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_load_error() {
        let result = OnnxScoringModel::load(Path::new("/models/does_not_exist.onnx"), 8);
        assert!(matches!(result, Err(ScoringError::ModelLoadError(_))));
    }

    #[test]
    fn test_garbage_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();
        let result = OnnxScoringModel::load(&path, 8);
        assert!(matches!(result, Err(ScoringError::ModelLoadError(_))));
    }
}
