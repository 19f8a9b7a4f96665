use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::ml::{CategoryPrediction, TextPipeline};
use crate::storage::{GenreCount, ModelArtifact, Storage};
use crate::taxonomy::{category_group, CategoryGroup};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub group: CategoryGroup,
    pub count: u64,
    /// Fraction of all stored messages carrying the category.
    pub share: f64,
}

/// Summary of the cleaned table, computed once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_messages: u64,
    pub genres: Vec<GenreCount>,
    pub categories: Vec<CategoryShare>,
}

impl DatasetOverview {
    pub fn from_storage(storage: &Storage, table: &str) -> Result<Self> {
        let total_messages = storage.row_count(table)?;
        let genres = storage.genre_counts(table)?;
        let categories = storage
            .category_counts(table)?
            .into_iter()
            .map(|c| CategoryShare {
                group: category_group(&c.category),
                share: if total_messages == 0 {
                    0.0
                } else {
                    c.count as f64 / total_messages as f64
                },
                category: c.category,
                count: c.count,
            })
            .collect();

        Ok(Self {
            total_messages,
            genres,
            categories,
        })
    }
}

/// Read-only state shared by every request handler.
#[derive(Debug)]
pub struct AppContext {
    pipeline: TextPipeline,
    overview: Option<DatasetOverview>,
}

impl AppContext {
    pub fn new(pipeline: TextPipeline) -> Self {
        Self {
            pipeline,
            overview: None,
        }
    }

    /// Loads the artifact and, when the store file exists, checks its
    /// schema against the artifact before summarizing it.
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        let artifact =
            ModelArtifact::load_expecting(&config.model_path, config.expected_categories)?;
        tracing::info!(
            "Loaded model trained at {} with {} categories",
            artifact.trained_at.format("%Y-%m-%d %H:%M:%S UTC"),
            artifact.categories.len()
        );

        let overview = match config.database_path.as_deref() {
            Some(db) if Path::new(db).exists() => {
                let storage = Storage::new(db)?;
                if storage.table_exists(&config.table_name)? {
                    let schema = storage.category_schema(&config.table_name)?;
                    if schema.names() != artifact.categories.as_slice() {
                        return Err(Error::ArtifactLoad {
                            path: config.model_path.clone().into(),
                            reason: format!(
                                "categories do not match table '{}' in {}",
                                config.table_name, db
                            ),
                        });
                    }
                    Some(DatasetOverview::from_storage(&storage, &config.table_name)?)
                } else {
                    tracing::warn!(
                        "Table '{}' not found in {}, overview disabled",
                        config.table_name,
                        db
                    );
                    None
                }
            }
            Some(db) => {
                tracing::warn!("Database {} not found, overview disabled", db);
                None
            }
            None => None,
        };

        let pipeline = match config.decision_threshold {
            Some(threshold) => {
                tracing::info!(
                    "Serving at threshold {} instead of the trained {}",
                    threshold,
                    artifact.pipeline.threshold()
                );
                artifact.pipeline.with_threshold(threshold)
            }
            None => artifact.pipeline,
        };
        Ok(Self { pipeline, overview })
    }

    pub fn categories(&self) -> &[String] {
        self.pipeline.categories()
    }

    pub fn classify(&self, text: &str) -> Vec<CategoryPrediction> {
        self.pipeline.classify(text)
    }

    pub fn overview(&self) -> Option<&DatasetOverview> {
        self.overview.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::PipelineParams;
    use crate::models::{CategorySchema, Genre, LabeledDataset, LabeledMessage, Message};
    use tempfile::TempDir;

    fn dataset() -> LabeledDataset {
        let schema = CategorySchema::new(vec!["water".into(), "fire".into()]).unwrap();
        let rows = [
            ("we need water", Genre::Direct, [1, 0]),
            ("the house is on fire", Genre::News, [0, 1]),
            ("water and fire everywhere", Genre::Direct, [1, 1]),
            ("all good here", Genre::Social, [0, 0]),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (text, genre, labels))| LabeledMessage {
            message: Message::new(i as i64 + 1, text, genre),
            labels: labels.to_vec(),
        })
        .collect();
        LabeledDataset { schema, rows }
    }

    fn fit(categories: &[&str], threshold: f64) -> TextPipeline {
        let data = dataset();
        let names: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        TextPipeline::fit(
            &data.texts(),
            &data.label_matrix(),
            &names,
            PipelineParams::default(),
            threshold,
        )
        .unwrap()
    }

    fn save(dir: &TempDir, pipeline: TextPipeline) -> String {
        let path = dir.path().join("model.json");
        ModelArtifact::new(pipeline, 4).save(&path).unwrap();
        path.display().to_string()
    }

    fn write_artifact(dir: &TempDir, categories: &[&str]) -> String {
        save(dir, fit(categories, 0.5))
    }

    fn service_config(model_path: String, database_path: Option<String>) -> ServiceConfig {
        ServiceConfig {
            model_path,
            database_path,
            table_name: "message_categories".to_string(),
            decision_threshold: None,
            expected_categories: None,
        }
    }

    #[test]
    fn test_load_with_overview() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("DisasterResponse.db");
        Storage::new(&db)
            .unwrap()
            .write_dataset("message_categories", &dataset())
            .unwrap();
        let model = write_artifact(&dir, &["water", "fire"]);

        let context =
            AppContext::load(&service_config(model, Some(db.display().to_string()))).unwrap();
        let overview = context.overview().unwrap();
        assert_eq!(overview.total_messages, 4);
        assert_eq!(overview.categories[0].category, "water");
        assert_eq!(overview.categories[0].count, 2);
        assert_eq!(overview.categories[0].share, 0.5);
        assert_eq!(overview.categories[1].group, CategoryGroup::Weather);
    }

    #[test]
    fn test_schema_mismatch_fails_startup() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("DisasterResponse.db");
        Storage::new(&db)
            .unwrap()
            .write_dataset("message_categories", &dataset())
            .unwrap();
        let model = write_artifact(&dir, &["fire", "water"]);

        let result = AppContext::load(&service_config(model, Some(db.display().to_string())));
        assert!(matches!(result, Err(Error::ArtifactLoad { .. })));
    }

    #[test]
    fn test_missing_database_disables_overview() {
        let dir = TempDir::new().unwrap();
        let model = write_artifact(&dir, &["water", "fire"]);
        let missing = dir.path().join("none.db").display().to_string();
        let context = AppContext::load(&service_config(model, Some(missing))).unwrap();
        assert!(context.overview().is_none());
        assert_eq!(context.categories().len(), 2);
    }

    #[test]
    fn test_expected_category_count_enforced() {
        let dir = TempDir::new().unwrap();
        let model = write_artifact(&dir, &["water", "fire"]);
        let mut config = service_config(model, None);
        config.expected_categories = Some(36);
        assert!(matches!(
            AppContext::load(&config),
            Err(Error::ArtifactLoad { .. })
        ));
    }

    #[test]
    fn test_serves_at_trained_threshold_unless_overridden() {
        let dir = TempDir::new().unwrap();
        let trained = fit(&["water", "fire"], 0.2);
        let model = save(&dir, trained.clone());
        let texts = ["hello", "zzz", "we need water", "fire", ""];

        let context = AppContext::load(&service_config(model.clone(), None)).unwrap();
        assert_eq!(context.pipeline.threshold(), 0.2);
        for text in texts {
            let served: Vec<u8> = context.classify(text).iter().map(|p| p.label).collect();
            assert_eq!(served, trained.predict(text), "text {:?}", text);
        }

        let mut config = service_config(model, None);
        config.decision_threshold = Some(0.9);
        let context = AppContext::load(&config).unwrap();
        assert_eq!(context.pipeline.threshold(), 0.9);
        let relabelled = trained.with_threshold(0.9);
        for text in texts {
            let served: Vec<u8> = context.classify(text).iter().map(|p| p.label).collect();
            assert_eq!(served, relabelled.predict(text), "text {:?}", text);
        }
    }
}
