use serde::{Deserialize, Serialize};

use super::classifier::{BinaryClassifier, ClassifierParams};
use super::features::SparseVector;

/// One independent binary classifier per category, in category order, all
/// reading the same feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelClassifier {
    estimators: Vec<BinaryClassifier>,
}

impl MultiLabelClassifier {
    /// `labels` is row-major: one vector of `n_labels` values per sample.
    pub fn fit(
        features: &[SparseVector],
        labels: &[Vec<u8>],
        n_labels: usize,
        dim: usize,
        params: &ClassifierParams,
    ) -> Self {
        let estimators = (0..n_labels)
            .map(|column| {
                let target: Vec<u8> = labels
                    .iter()
                    .map(|row| row.get(column).copied().unwrap_or(0))
                    .collect();
                BinaryClassifier::fit(features, &target, dim, params)
            })
            .collect();
        Self { estimators }
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }

    pub fn estimators(&self) -> &[BinaryClassifier] {
        &self.estimators
    }

    pub fn predict_proba(&self, x: &SparseVector) -> Vec<f64> {
        self.estimators.iter().map(|e| e.probability(x)).collect()
    }

    pub fn predict(&self, x: &SparseVector, threshold: f64) -> Vec<u8> {
        self.estimators
            .iter()
            .map(|e| e.predict(x, threshold))
            .collect()
    }
}
