use std::path::Path;

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::ml::split::train_test_split;
use crate::ml::{EvaluationReport, GridSearch, ParamGrid, TextPipeline};
use crate::models::LabeledDataset;
use crate::storage::{ModelArtifact, Storage};

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingOutcome {
    pub fn evaluation(&self) -> Option<&EvaluationReport> {
        self.artifact.evaluation.as_ref()
    }
}

pub struct TrainingPipeline {
    storage: Storage,
    config: TrainingConfig,
    grid: ParamGrid,
    show_progress: bool,
}

impl TrainingPipeline {
    pub fn new(storage: Storage, config: TrainingConfig) -> Self {
        Self {
            storage,
            config,
            grid: ParamGrid::default(),
            show_progress: false,
        }
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Row indices for the (train, test) partition of a dataset of `len` rows.
    pub fn split(&self, len: usize) -> (Vec<usize>, Vec<usize>) {
        train_test_split(
            (0..len).collect(),
            self.config.test_ratio,
            self.config.split_seed,
        )
    }

    pub fn run(&self) -> Result<TrainingOutcome> {
        tracing::info!("Loading data from table '{}'...", self.config.table_name);
        let dataset = self.storage.load_dataset(&self.config.table_name)?;
        self.train(&dataset)
    }

    /// Search on the training rows only, refit the winner on them and score
    /// it once on the held-out rows.
    pub fn train(&self, dataset: &LabeledDataset) -> Result<TrainingOutcome> {
        if dataset.len() < 2 {
            return Err(Error::EmptyDataset(format!(
                "need at least 2 rows to train, table '{}' has {}",
                self.config.table_name,
                dataset.len()
            )));
        }

        let categories = dataset.schema.names().to_vec();
        let texts = dataset.texts();
        let labels = dataset.label_matrix();

        let (train_idx, test_idx) = self.split(dataset.len());
        let train_texts: Vec<&str> = train_idx.iter().map(|&i| texts[i]).collect();
        let train_labels: Vec<Vec<u8>> = train_idx.iter().map(|&i| labels[i].clone()).collect();
        let test_texts: Vec<&str> = test_idx.iter().map(|&i| texts[i]).collect();
        let test_labels: Vec<Vec<u8>> = test_idx.iter().map(|&i| labels[i].clone()).collect();

        tracing::info!(
            "Building model on {} training rows ({} held out)...",
            train_texts.len(),
            test_texts.len()
        );
        let search = GridSearch::new(
            self.grid.clone(),
            self.config.cv_folds,
            self.config.scoring.scorer(),
        )
        .with_threshold(self.config.decision_threshold)
        .with_progress(self.show_progress)
        .run(&train_texts, &train_labels, &categories)?;

        tracing::info!("Training model...");
        let pipeline = TextPipeline::fit(
            &train_texts,
            &train_labels,
            &categories,
            search.best,
            self.config.decision_threshold,
        )?;

        tracing::info!("Evaluating model...");
        let predicted = pipeline.predict_many(&test_texts);
        let evaluation = EvaluationReport::compute(&categories, &test_labels, &predicted);
        tracing::info!(
            "Held-out mean F1 {:.4}, accuracy {:.4}",
            evaluation.mean_f1,
            evaluation.overall_accuracy
        );

        let artifact = ModelArtifact::new(pipeline, train_texts.len())
            .with_evaluation(evaluation)
            .with_search(search);

        Ok(TrainingOutcome {
            artifact,
            train_rows: train_texts.len(),
            test_rows: test_texts.len(),
        })
    }

    pub fn run_and_save<P: AsRef<Path>>(&self, model_path: P) -> Result<TrainingOutcome> {
        let outcome = self.run()?;
        tracing::info!("Saving model...");
        outcome.artifact.save(model_path)?;
        Ok(outcome)
    }
}
