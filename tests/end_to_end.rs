use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use disaster_response::config::{DEFAULT_TABLE_NAME, ServiceConfig};
use disaster_response::taxonomy::{pack_categories, CATEGORY_COUNT};
use disaster_response::{
    AppContext, Config, EtlConfig, EtlPipeline, ModelArtifact, ParamGrid, Storage, TrainingConfig,
    TrainingPipeline,
};
use tempfile::TempDir;

const PLACES: [&str; 10] = [
    "Leogane", "Jacmel", "Carrefour", "Petionville", "Gonaives", "Cap Haitien", "Les Cayes",
    "Delmas", "Hinche", "Jeremie",
];

/// Writes both source files and returns their paths. Water requests and
/// storm reports never share a word that matters to the classifier.
fn write_sources(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut messages = String::from("id,message,original,genre\n");
    let mut categories = String::from("id,categories\n");
    let mut id = 0;

    for place in PLACES {
        id += 1;
        writeln!(messages, "{},We need water in {},,direct", id, place).unwrap();
        writeln!(
            categories,
            "{},{}",
            id,
            pack_categories(&["related", "request", "aid_related", "water"])
        )
        .unwrap();

        id += 1;
        writeln!(
            messages,
            "{},No clean drinking water left near {},,direct",
            id, place
        )
        .unwrap();
        writeln!(
            categories,
            "{},{}",
            id,
            pack_categories(&["related", "aid_related", "water"])
        )
        .unwrap();

        id += 1;
        writeln!(messages, "{},The storm damaged roofs around {},,news", id, place).unwrap();
        writeln!(
            categories,
            "{},{}",
            id,
            pack_categories(&["related", "weather_related", "storm"])
        )
        .unwrap();

        id += 1;
        writeln!(messages, "{},Schools reopened today in {},,social", id, place).unwrap();
        writeln!(categories, "{},{}", id, pack_categories(&[])).unwrap();
    }

    // An exact duplicate and a message without categories
    writeln!(messages, "1,We need water in Leogane,,direct").unwrap();
    writeln!(messages, "999,Orphan message,,direct").unwrap();

    let messages_path = dir.join("messages.csv");
    let categories_path = dir.join("categories.csv");
    fs::write(&messages_path, messages).unwrap();
    fs::write(&categories_path, categories).unwrap();
    (messages_path, categories_path)
}

#[test]
fn etl_train_and_serve() {
    let dir = TempDir::new().unwrap();
    let (messages_path, categories_path) = write_sources(dir.path());
    let db_path = dir.path().join("DisasterResponse.db");
    let model_path = dir.path().join("classifier.json");
    let config = Config::default();

    let etl = EtlPipeline::new(Storage::new(&db_path).unwrap(), EtlConfig::from(&config));
    let report = etl.run(&messages_path, &categories_path).unwrap();
    assert_eq!(report.category_count, CATEGORY_COUNT);
    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.unmatched_messages, 1);
    assert_eq!(report.rows_written, 40);

    let training_config = TrainingConfig::from(&config);
    let training = TrainingPipeline::new(Storage::new(&db_path).unwrap(), training_config)
        .with_grid(ParamGrid::quick());
    let outcome = training.run_and_save(&model_path).unwrap();
    assert_eq!(outcome.train_rows + outcome.test_rows, 40);
    assert_eq!(outcome.test_rows, 10);

    let service_config = ServiceConfig {
        model_path: model_path.display().to_string(),
        database_path: Some(db_path.display().to_string()),
        table_name: DEFAULT_TABLE_NAME.to_string(),
        decision_threshold: None,
        expected_categories: Some(CATEGORY_COUNT),
    };
    let context = AppContext::load(&service_config).unwrap();
    assert_eq!(context.overview().unwrap().total_messages, 40);

    let predictions = context.classify("We need water urgently");
    assert_eq!(predictions.len(), CATEGORY_COUNT);
    let water = predictions.iter().find(|p| p.category == "water").unwrap();
    assert!(water.probability > 0.5, "water probability {}", water.probability);
    assert_eq!(water.label, 1);
    let storm = predictions.iter().find(|p| p.category == "storm").unwrap();
    assert_eq!(storm.label, 0);

    let empty = context.classify("");
    assert_eq!(empty.len(), CATEGORY_COUNT);
    assert!(empty.iter().all(|p| p.label == 0));
}

#[test]
fn saved_model_predicts_like_trained_model() {
    let dir = TempDir::new().unwrap();
    let (messages_path, categories_path) = write_sources(dir.path());
    let db_path = dir.path().join("DisasterResponse.db");
    let model_path = dir.path().join("classifier.json");
    let config = Config::default();

    EtlPipeline::new(Storage::new(&db_path).unwrap(), EtlConfig::from(&config))
        .run(&messages_path, &categories_path)
        .unwrap();
    let training_config = TrainingConfig::from(&config);
    let outcome = TrainingPipeline::new(Storage::new(&db_path).unwrap(), training_config)
        .with_grid(ParamGrid::quick())
        .run_and_save(&model_path)
        .unwrap();

    let loaded = ModelArtifact::load(&model_path).unwrap();
    assert_eq!(loaded.evaluation, outcome.artifact.evaluation);
    for text in ["We need water urgently", "storm in Jacmel", "", "hello"] {
        assert_eq!(
            loaded.pipeline.predict(text),
            outcome.artifact.pipeline.predict(text)
        );
    }
}
