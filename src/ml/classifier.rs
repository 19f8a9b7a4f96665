use serde::{Deserialize, Serialize};

use super::features::SparseVector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub learning_rate: f64,
    /// L2 penalty applied to the weights, not the bias.
    pub l2: f64,
    pub epochs: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            learning_rate: 1.0,
            l2: 1e-4,
            epochs: 100,
        }
    }
}

/// Decision component for a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinaryClassifier {
    /// The training labels held a single class.
    Constant { label: u8 },
    Logistic { weights: Vec<f64>, bias: f64 },
}

impl BinaryClassifier {
    /// Full-batch gradient descent on the logistic loss, starting from zero
    /// weights and the log-odds of the positive rate. No randomness is
    /// involved, so equal inputs give equal models.
    pub fn fit(
        features: &[SparseVector],
        labels: &[u8],
        dim: usize,
        params: &ClassifierParams,
    ) -> Self {
        let positives = labels.iter().filter(|&&y| y > 0).count();
        if positives == 0 || positives == labels.len() {
            return BinaryClassifier::Constant {
                label: u8::from(positives > 0),
            };
        }

        let n = labels.len() as f64;
        let prior = positives as f64 / n;
        let mut weights = vec![0.0; dim];
        let mut bias = (prior / (1.0 - prior)).ln();
        let mut gradient = vec![0.0; dim];

        for _ in 0..params.epochs {
            gradient.iter_mut().for_each(|g| *g = 0.0);
            let mut bias_gradient = 0.0;

            for (x, &y) in features.iter().zip(labels) {
                let error = sigmoid(dot(&weights, x) + bias) - f64::from(y.min(1));
                for &(idx, value) in x {
                    gradient[idx] += error * value;
                }
                bias_gradient += error;
            }

            for (w, g) in weights.iter_mut().zip(&gradient) {
                *w -= params.learning_rate * (g / n + params.l2 * *w);
            }
            bias -= params.learning_rate * bias_gradient / n;
        }

        BinaryClassifier::Logistic { weights, bias }
    }

    pub fn probability(&self, x: &SparseVector) -> f64 {
        match self {
            BinaryClassifier::Constant { label } => f64::from(*label),
            BinaryClassifier::Logistic { weights, bias } => sigmoid(dot(weights, x) + bias),
        }
    }

    pub fn predict(&self, x: &SparseVector, threshold: f64) -> u8 {
        match self {
            BinaryClassifier::Constant { label } => *label,
            BinaryClassifier::Logistic { .. } => u8::from(self.probability(x) >= threshold),
        }
    }

    /// Input width this component was fitted for, if it has weights.
    pub fn dim(&self) -> Option<usize> {
        match self {
            BinaryClassifier::Constant { .. } => None,
            BinaryClassifier::Logistic { weights, .. } => Some(weights.len()),
        }
    }
}

fn dot(weights: &[f64], x: &SparseVector) -> f64 {
    x.iter()
        .filter_map(|&(idx, value)| weights.get(idx).map(|w| w * value))
        .sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
