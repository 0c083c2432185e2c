/// Hybrid factorization model
///
/// Users are represented only through their side features, so the user
/// embedding is the feature-weighted sum of feature embeddings:
///
/// `score(x, i) = (xᵀ·E_user)·v_i + xᵀ·β_user + b_i`
///
/// Item representations `v_i` and biases `b_i` are exported precomputed,
/// one row per item index.
use super::{check_request, Result, ScoringEngine, ScoringError};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use std::path::Path;

/// JSON artifact written by the training pipeline
#[derive(Debug, Deserialize)]
struct FactorizationArtifact {
    no_components: usize,
    user_embeddings: Vec<Vec<f32>>,
    user_biases: Vec<f32>,
    item_embeddings: Vec<Vec<f32>>,
    item_biases: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct FactorizationModel {
    /// n_features × no_components
    user_embeddings: Array2<f32>,
    user_biases: Array1<f32>,
    /// n_items × no_components
    item_embeddings: Array2<f32>,
    item_biases: Array1<f32>,
}

impl FactorizationModel {
    pub fn new(
        user_embeddings: Array2<f32>,
        user_biases: Array1<f32>,
        item_embeddings: Array2<f32>,
        item_biases: Array1<f32>,
    ) -> Result<Self> {
        if user_embeddings.ncols() != item_embeddings.ncols() {
            return Err(ScoringError::InvalidModel(format!(
                "user embeddings have {} components, item embeddings {}",
                user_embeddings.ncols(),
                item_embeddings.ncols()
            )));
        }
        if user_biases.len() != user_embeddings.nrows() {
            return Err(ScoringError::InvalidModel(format!(
                "{} user biases for {} user features",
                user_biases.len(),
                user_embeddings.nrows()
            )));
        }
        if item_biases.len() != item_embeddings.nrows() {
            return Err(ScoringError::InvalidModel(format!(
                "{} item biases for {} items",
                item_biases.len(),
                item_embeddings.nrows()
            )));
        }
        Ok(Self {
            user_embeddings,
            user_biases,
            item_embeddings,
            item_biases,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScoringError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        let artifact: FactorizationArtifact = serde_json::from_str(&raw).map_err(|e| {
            ScoringError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: FactorizationArtifact) -> Result<Self> {
        let d = artifact.no_components;
        let user_embeddings = to_matrix("user_embeddings", artifact.user_embeddings, d)?;
        let item_embeddings = to_matrix("item_embeddings", artifact.item_embeddings, d)?;
        Self::new(
            user_embeddings,
            Array1::from(artifact.user_biases),
            item_embeddings,
            Array1::from(artifact.item_biases),
        )
    }

    pub fn no_components(&self) -> usize {
        self.user_embeddings.ncols()
    }
}

fn to_matrix(name: &str, rows: Vec<Vec<f32>>, width: usize) -> Result<Array2<f32>> {
    let n = rows.len();
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(ScoringError::InvalidModel(format!(
            "{} row {} has {} components, expected {}",
            name,
            idx,
            row.len(),
            width
        )));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, width), flat)
        .map_err(|e| ScoringError::InvalidModel(format!("{}: {}", name, e)))
}

impl ScoringEngine for FactorizationModel {
    fn n_features(&self) -> usize {
        self.user_embeddings.nrows()
    }

    fn n_items(&self) -> usize {
        self.item_embeddings.nrows()
    }

    fn backend(&self) -> &'static str {
        "factorization"
    }

    fn predict(&self, user_features: ArrayView1<'_, f32>, item_ids: &[usize]) -> Result<Array1<f32>> {
        check_request(&user_features, item_ids, self.n_features(), self.n_items())?;

        let user_repr = user_features.dot(&self.user_embeddings);
        let user_bias = user_features.dot(&self.user_biases);

        let scores = item_ids.iter().map(|&i| {
            self.item_embeddings.row(i).dot(&user_repr) + user_bias + self.item_biases[i]
        });

        Ok(Array1::from_iter(scores))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use ndarray::array;

    /// Matches `catalog::fixtures::catalog()`: 3 author features, 6 items.
    ///
    /// Agatha Christie favours isbn-3 then isbn-0; John Grisham favours
    /// isbn-1 then isbn-4; Stephen King favours isbn-5 then isbn-2.
    pub fn model() -> FactorizationModel {
        let user_embeddings = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let user_biases = array![0.0, 0.0, 0.0];
        let item_embeddings = array![
            [0.8, 0.0, 0.0],
            [0.0, 0.9, 0.0],
            [0.0, 0.0, 0.7],
            [0.9, 0.0, 0.0],
            [0.0, 0.6, 0.0],
            [0.0, 0.0, 0.95],
        ];
        let item_biases = array![0.01, 0.02, 0.03, 0.0, 0.0, 0.0];
        FactorizationModel::new(user_embeddings, user_biases, item_embeddings, item_biases)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::model;
    use super::*;
    use ndarray::array;

    #[test]
    fn test_score_is_dot_product_plus_biases() {
        let m = FactorizationModel::new(
            array![[1.0, 2.0], [0.5, -1.0]],
            array![0.1, 0.2],
            array![[1.0, 1.0], [2.0, 0.0]],
            array![0.5, -0.5],
        )
        .unwrap();

        let x = array![1.0_f32, 1.0];
        let scores = m.predict(x.view(), &[0, 1]).unwrap();
        // u = [1.5, 1.0], b_u = 0.3
        assert!((scores[0] - (2.5 + 0.3 + 0.5)).abs() < 1e-6);
        assert!((scores[1] - (3.0 + 0.3 - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_output_follows_item_id_order() {
        let m = model();
        let x = array![1.0_f32, 0.0, 0.0];
        let all = m.predict_all(x.view()).unwrap();
        let picked = m.predict(x.view(), &[3, 0]).unwrap();
        assert_eq!(picked[0], all[3]);
        assert_eq!(picked[1], all[0]);
    }

    #[test]
    fn test_zero_vector_scores_item_bias_only() {
        let m = model();
        let x = Array1::<f32>::zeros(3);
        let scores = m.predict_all(x.view()).unwrap();
        assert!((scores[2] - 0.03).abs() < 1e-6);
        assert_eq!(scores[5], 0.0);
    }

    #[test]
    fn test_wrong_dimension_is_an_error() {
        let m = model();
        let x = Array1::<f32>::zeros(4);
        assert!(matches!(
            m.predict_all(x.view()),
            Err(ScoringError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_mismatched_shapes_rejected() {
        let result = FactorizationModel::new(
            array![[1.0, 2.0]],
            array![0.0],
            array![[1.0, 1.0, 1.0]],
            array![0.0],
        );
        assert!(matches!(result, Err(ScoringError::InvalidModel(_))));
    }

    #[test]
    fn test_ragged_artifact_rejected() {
        let artifact = FactorizationArtifact {
            no_components: 2,
            user_embeddings: vec![vec![1.0, 0.0], vec![1.0]],
            user_biases: vec![0.0, 0.0],
            item_embeddings: vec![vec![1.0, 0.0]],
            item_biases: vec![0.0],
        };
        assert!(matches!(
            FactorizationModel::from_artifact(artifact),
            Err(ScoringError::InvalidModel(_))
        ));
    }
}
