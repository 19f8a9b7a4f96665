use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::ml::grid::GridSearchResult;
use crate::ml::{EvaluationReport, PipelineParams, TextPipeline};

/// Bumped whenever the serialized pipeline layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Everything a training run leaves behind for the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub params: PipelineParams,
    pub training_rows: usize,
    pub evaluation: Option<EvaluationReport>,
    pub search: Option<GridSearchResult>,
    pub pipeline: TextPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: TextPipeline, training_rows: usize) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            categories: pipeline.categories().to_vec(),
            params: *pipeline.params(),
            training_rows,
            evaluation: None,
            search: None,
            pipeline,
        }
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationReport) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    pub fn with_search(mut self, search: GridSearchResult) -> Self {
        self.search = Some(search);
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialization_error = |reason: String| Error::Serialization {
            path: path.to_path_buf(),
            reason,
        };

        let file = fs::File::create(path).map_err(|e| serialization_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| serialization_error(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| serialization_error(e.to_string()))?;

        tracing::info!(
            "Saved model artifact with {} categories to {}",
            self.categories.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads an artifact and checks that it is internally consistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| Error::ArtifactLoad {
            path: path.to_path_buf(),
            reason,
        };

        let raw = fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let artifact: ModelArtifact = serde_json::from_slice(&raw)
            .map_err(|e| load_error(format!("invalid artifact: {}", e)))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(load_error(format!(
                "format version {} is not supported (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if artifact.categories.as_slice() != artifact.pipeline.categories() {
            return Err(load_error(
                "category list does not match the fitted pipeline".to_string(),
            ));
        }
        artifact.pipeline.validate().map_err(load_error)?;

        Ok(artifact)
    }

    /// `load` plus a check against the number of categories the caller serves.
    pub fn load_expecting<P: AsRef<Path>>(
        path: P,
        expected_categories: Option<usize>,
    ) -> Result<Self> {
        let artifact = Self::load(path.as_ref())?;
        if let Some(expected) = expected_categories {
            if artifact.categories.len() != expected {
                return Err(Error::ArtifactLoad {
                    path: path.as_ref().to_path_buf(),
                    reason: format!(
                        "artifact has {} categories, expected {}",
                        artifact.categories.len(),
                        expected
                    ),
                });
            }
        }
        Ok(artifact)
    }
}
