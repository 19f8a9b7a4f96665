use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::classifier::ClassifierParams;
use super::features::VectorizerParams;
use super::metrics::{mean_f1, multioutput_fscore};
use super::pipeline::{PipelineParams, TextPipeline};
use super::split::kfold_indices;
use crate::error::{Error, Result};

/// Aggregate score over a label matrix; higher is better.
pub type ScoreFn = fn(&[Vec<u8>], &[Vec<u8>]) -> f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    MeanF1,
    GeometricMeanF1,
}

impl Scoring {
    pub fn scorer(self) -> ScoreFn {
        match self {
            Scoring::MeanF1 => mean_f1,
            Scoring::GeometricMeanF1 => gmean_f1,
        }
    }
}

fn gmean_f1(y_true: &[Vec<u8>], y_pred: &[Vec<u8>]) -> f64 {
    multioutput_fscore(y_true, y_pred, 1.0)
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::MeanF1 => write!(f, "mean_f1"),
            Scoring::GeometricMeanF1 => write!(f, "gmean_f1"),
        }
    }
}

impl FromStr for Scoring {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean_f1" | "f1" => Ok(Scoring::MeanF1),
            "gmean_f1" | "multioutput_f1" => Ok(Scoring::GeometricMeanF1),
            other => Err(Error::Config(format!("unknown scoring '{}'", other))),
        }
    }
}

/// Finite set of values per tunable parameter. Every combination is one
/// candidate; parameters not listed come from `base`.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub base: PipelineParams,
    pub ngram_max: Vec<usize>,
    pub max_df: Vec<f64>,
    pub use_idf: Vec<bool>,
    pub starting_verb: Vec<bool>,
    pub learning_rate: Vec<f64>,
    pub l2: Vec<f64>,
    pub epochs: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            base: PipelineParams::default(),
            ngram_max: vec![1, 2],
            max_df: vec![0.75, 1.0],
            use_idf: vec![true],
            starting_verb: vec![false, true],
            learning_rate: vec![1.0],
            l2: vec![1e-4, 1e-3],
            epochs: vec![100],
        }
    }
}

impl ParamGrid {
    /// A grid holding exactly one candidate.
    pub fn single(params: PipelineParams) -> Self {
        Self {
            base: params,
            ngram_max: vec![params.vectorizer.ngram_max],
            max_df: vec![params.vectorizer.max_df],
            use_idf: vec![params.vectorizer.use_idf],
            starting_verb: vec![params.vectorizer.starting_verb],
            learning_rate: vec![params.classifier.learning_rate],
            l2: vec![params.classifier.l2],
            epochs: vec![params.classifier.epochs],
        }
    }

    /// Two candidates, for fast runs.
    pub fn quick() -> Self {
        Self {
            ngram_max: vec![1],
            max_df: vec![1.0],
            starting_verb: vec![false],
            l2: vec![1e-4],
            epochs: vec![50],
            use_idf: vec![true, false],
            ..Self::default()
        }
    }

    /// Cartesian product in declaration order; empty lists fall back to the
    /// base value.
    pub fn candidates(&self) -> Vec<PipelineParams> {
        let base = self.base;
        let ngram_max = non_empty(&self.ngram_max, base.vectorizer.ngram_max);
        let max_df = non_empty(&self.max_df, base.vectorizer.max_df);
        let use_idf = non_empty(&self.use_idf, base.vectorizer.use_idf);
        let starting_verb = non_empty(&self.starting_verb, base.vectorizer.starting_verb);
        let learning_rate = non_empty(&self.learning_rate, base.classifier.learning_rate);
        let l2 = non_empty(&self.l2, base.classifier.l2);
        let epochs = non_empty(&self.epochs, base.classifier.epochs);

        let mut out = Vec::new();
        for &n in &ngram_max {
            for &df in &max_df {
                for &idf in &use_idf {
                    for &verb in &starting_verb {
                        for &lr in &learning_rate {
                            for &penalty in &l2 {
                                for &ep in &epochs {
                                    out.push(PipelineParams {
                                        vectorizer: VectorizerParams {
                                            ngram_max: n,
                                            max_df: df,
                                            use_idf: idf,
                                            starting_verb: verb,
                                            ..base.vectorizer
                                        },
                                        classifier: ClassifierParams {
                                            learning_rate: lr,
                                            l2: penalty,
                                            epochs: ep,
                                        },
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn non_empty<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: PipelineParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best: PipelineParams,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Exhaustive search over a `ParamGrid` with k-fold cross-validation and an
/// injected scoring function.
pub struct GridSearch<F> {
    grid: ParamGrid,
    folds: usize,
    scorer: F,
    threshold: f64,
    show_progress: bool,
}

impl<F> GridSearch<F>
where
    F: Fn(&[Vec<u8>], &[Vec<u8>]) -> f64,
{
    pub fn new(grid: ParamGrid, folds: usize, scorer: F) -> Self {
        Self {
            grid,
            folds,
            scorer,
            threshold: 0.5,
            show_progress: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Scores every candidate on folds of the given rows only. Ties keep the
    /// earlier candidate.
    pub fn run(
        &self,
        texts: &[&str],
        labels: &[Vec<u8>],
        categories: &[String],
    ) -> Result<GridSearchResult> {
        let candidates = self.grid.candidates();
        let first = *candidates
            .first()
            .ok_or_else(|| Error::Config("parameter grid has no candidates".to_string()))?;
        let folds = kfold_indices(texts.len(), self.folds);

        if folds.is_empty() {
            tracing::warn!(
                "Only {} training rows, skipping cross-validation and using the first candidate",
                texts.len()
            );
            return Ok(GridSearchResult {
                best: first,
                best_score: 0.0,
                candidates: Vec::new(),
            });
        }

        tracing::info!(
            "Grid search: {} candidates x {} folds over {} rows",
            candidates.len(),
            folds.len(),
            texts.len()
        );

        let pb = if self.show_progress {
            ProgressBar::new((candidates.len() * folds.len()) as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fits",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut scored = Vec::with_capacity(candidates.len());
        for params in candidates {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for (train_idx, valid_idx) in &folds {
                let train_texts: Vec<&str> = train_idx.iter().map(|&i| texts[i]).collect();
                let train_labels: Vec<Vec<u8>> =
                    train_idx.iter().map(|&i| labels[i].clone()).collect();
                let valid_texts: Vec<&str> = valid_idx.iter().map(|&i| texts[i]).collect();
                let valid_labels: Vec<Vec<u8>> =
                    valid_idx.iter().map(|&i| labels[i].clone()).collect();

                let pipeline = TextPipeline::fit(
                    &train_texts,
                    &train_labels,
                    categories,
                    params,
                    self.threshold,
                )?;
                let predicted = pipeline.predict_many(&valid_texts);
                fold_scores.push((self.scorer)(valid_labels.as_slice(), predicted.as_slice()));
                pb.inc(1);
            }

            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            tracing::debug!("Candidate {:?} scored {:.4}", params, mean_score);
            scored.push(CandidateScore {
                params,
                fold_scores,
                mean_score,
            });
        }
        pb.finish_with_message("Grid search complete");

        let best = scored
            .iter()
            .fold(None::<&CandidateScore>, |best, candidate| match best {
                Some(b) if b.mean_score >= candidate.mean_score => Some(b),
                _ => Some(candidate),
            })
            .map(|c| (c.params, c.mean_score))
            .unwrap_or((first, 0.0));

        tracing::info!("Best candidate scored {:.4}", best.1);

        Ok(GridSearchResult {
            best: best.0,
            best_score: best.1,
            candidates: scored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_enumerates_product() {
        let grid = ParamGrid::default();
        assert_eq!(grid.candidates().len(), 2 * 2 * 2 * 2);
        assert_eq!(ParamGrid::quick().candidates().len(), 2);
        assert_eq!(
            ParamGrid::single(PipelineParams::default()).candidates(),
            vec![PipelineParams::default()]
        );
    }

    #[test]
    fn test_empty_lists_fall_back_to_base() {
        let grid = ParamGrid {
            ngram_max: Vec::new(),
            ..ParamGrid::quick()
        };
        let candidates = grid.candidates();
        assert!(candidates.iter().all(|c| c.vectorizer.ngram_max == 1));
    }

    #[test]
    fn test_scoring_parse() {
        assert_eq!("mean_f1".parse::<Scoring>().unwrap(), Scoring::MeanF1);
        assert_eq!("gmean_f1".parse::<Scoring>().unwrap(), Scoring::GeometricMeanF1);
        assert!("auc".parse::<Scoring>().is_err());
    }

    #[test]
    fn test_injected_scorer_picks_best() {
        let texts = [
            "water needed", "need water now", "clean water", "water please",
            "hello there", "thanks a lot", "see you soon", "good morning",
        ];
        let labels: Vec<Vec<u8>> = (0..8).map(|i| vec![u8::from(i < 4)]).collect();
        let categories = vec!["water".to_string()];

        let grid = ParamGrid::quick();
        let search = GridSearch::new(grid, 2, |_: &[Vec<u8>], _: &[Vec<u8>]| 0.5);
        let result = search.run(&texts, &labels, &categories).unwrap();
        assert_eq!(result.candidates.len(), 2);
        // Equal scores keep the first candidate
        assert!(result.best.vectorizer.use_idf);
        assert_eq!(result.candidates[0].fold_scores.len(), 2);
    }

    #[test]
    fn test_too_few_rows_uses_first_candidate() {
        let categories = vec!["water".to_string()];
        let search = GridSearch::new(ParamGrid::quick(), 3, mean_f1);
        let result = search.run(&["water"], &[vec![1]], &categories).unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.best, ParamGrid::quick().candidates()[0]);
    }
}
