use serde::{Deserialize, Serialize};

/// Confusion counts for one binary column, positive class = 1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_negative: u64,
}

impl ConfusionCounts {
    pub fn from_column(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t > 0, p > 0) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (true, false) => counts.false_negative += 1,
                (false, false) => counts.true_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        f_beta(self.precision(), self.recall(), 1.0)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// Support-weighted F-beta over both classes, counting only classes that
    /// occur in the ground truth.
    pub fn weighted_f_beta(&self, beta: f64) -> f64 {
        let positive_support = self.true_positive + self.false_negative;
        let negative_support = self.true_negative + self.false_positive;
        let total = positive_support + negative_support;
        if total == 0 {
            return 0.0;
        }

        let positive = f_beta(self.precision(), self.recall(), beta);
        let negative = f_beta(
            ratio(self.true_negative, self.true_negative + self.false_negative),
            ratio(self.true_negative, negative_support),
            beta,
        );

        (positive * positive_support as f64 + negative * negative_support as f64) / total as f64
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f_beta(precision: f64, recall: f64, beta: f64) -> f64 {
    let b2 = beta * beta;
    let denominator = b2 * precision + recall;
    if denominator > 0.0 {
        (1.0 + b2) * precision * recall / denominator
    } else {
        0.0
    }
}

fn column(matrix: &[Vec<u8>], index: usize) -> Vec<u8> {
    matrix
        .iter()
        .map(|row| row.get(index).copied().unwrap_or(0))
        .collect()
}

fn width(matrix: &[Vec<u8>]) -> usize {
    matrix.first().map(Vec::len).unwrap_or(0)
}

fn column_counts(y_true: &[Vec<u8>], y_pred: &[Vec<u8>]) -> Vec<ConfusionCounts> {
    (0..width(y_true))
        .map(|j| ConfusionCounts::from_column(&column(y_true, j), &column(y_pred, j)))
        .collect()
}

/// Mean of the positive-class F1 over all columns.
pub fn mean_f1(y_true: &[Vec<u8>], y_pred: &[Vec<u8>]) -> f64 {
    let counts = column_counts(y_true, y_pred);
    if counts.is_empty() {
        return 0.0;
    }
    counts.iter().map(ConfusionCounts::f1).sum::<f64>() / counts.len() as f64
}

/// Geometric mean of the per-column weighted F-beta, leaving out columns
/// scored exactly 1. Degenerate columns (all one class, predicted
/// perfectly) would otherwise inflate the score.
pub fn multioutput_fscore(y_true: &[Vec<u8>], y_pred: &[Vec<u8>], beta: f64) -> f64 {
    let scores: Vec<f64> = column_counts(y_true, y_pred)
        .iter()
        .map(|c| c.weighted_f_beta(beta))
        .filter(|&s| s < 1.0)
        .collect();

    if scores.is_empty() {
        return if width(y_true) == 0 { 0.0 } else { 1.0 };
    }
    if scores.iter().any(|&s| s <= 0.0) {
        return 0.0;
    }
    (scores.iter().map(|s| s.ln()).sum::<f64>() / scores.len() as f64).exp()
}

/// Fraction of matching cells over the whole matrix.
pub fn overall_accuracy(y_true: &[Vec<u8>], y_pred: &[Vec<u8>]) -> f64 {
    let mut total = 0u64;
    let mut correct = 0u64;
    for (t_row, p_row) in y_true.iter().zip(y_pred) {
        for (t, p) in t_row.iter().zip(p_row) {
            total += 1;
            correct += u64::from(t == p);
        }
    }
    ratio(correct, total)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub category: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    /// Positive rows in the ground truth.
    pub support: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub categories: Vec<CategoryMetrics>,
    pub overall_accuracy: f64,
    pub mean_f1: f64,
    pub multioutput_f1: f64,
}

impl EvaluationReport {
    pub fn compute(categories: &[String], y_true: &[Vec<u8>], y_pred: &[Vec<u8>]) -> Self {
        let per_category = categories
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let counts = ConfusionCounts::from_column(&column(y_true, j), &column(y_pred, j));
                CategoryMetrics {
                    category: name.clone(),
                    precision: counts.precision(),
                    recall: counts.recall(),
                    f1: counts.f1(),
                    accuracy: counts.accuracy(),
                    support: counts.true_positive + counts.false_negative,
                }
            })
            .collect();

        Self {
            samples: y_true.len(),
            categories: per_category,
            overall_accuracy: overall_accuracy(y_true, y_pred),
            mean_f1: mean_f1(y_true, y_pred),
            multioutput_f1: multioutput_fscore(y_true, y_pred, 1.0),
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryMetrics> {
        self.categories.iter().find(|c| c.category == name)
    }
}
