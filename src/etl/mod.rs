pub mod cleaner;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::EtlConfig;
use crate::error::{Error, Result};
use crate::models::{CategoryLabelSet, LabeledDataset, LabeledMessage, Message};
use crate::storage::Storage;

pub use cleaner::{deduplicate, discover_schema, expand_labels, join};
pub use loader::{load_categories, load_messages};

/// What to do with ids found in only one of the two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Drop unmatched rows on both sides.
    Inner,
    /// Fail on the first unmatched id.
    Strict,
}

impl FromStr for JoinPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inner" => Ok(JoinPolicy::Inner),
            "strict" => Ok(JoinPolicy::Strict),
            other => Err(Error::Config(format!("unknown join policy '{}'", other))),
        }
    }
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPolicy::Inner => write!(f, "inner"),
            JoinPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// What to do with category values other than 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    Drop,
    Clamp,
    Reject,
}

impl FromStr for OutOfRangePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(OutOfRangePolicy::Drop),
            "clamp" => Ok(OutOfRangePolicy::Clamp),
            "reject" => Ok(OutOfRangePolicy::Reject),
            other => Err(Error::Config(format!(
                "unknown out-of-range policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutOfRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutOfRangePolicy::Drop => write!(f, "drop"),
            OutOfRangePolicy::Clamp => write!(f, "clamp"),
            OutOfRangePolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlReport {
    pub messages_read: usize,
    pub category_rows_read: usize,
    pub unmatched_messages: usize,
    pub unmatched_categories: usize,
    pub out_of_range_dropped: usize,
    pub duplicates_dropped: usize,
    pub rows_written: usize,
    pub category_count: usize,
}

impl fmt::Display for EtlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages read:            {}", self.messages_read)?;
        writeln!(f, "Category rows read:       {}", self.category_rows_read)?;
        writeln!(
            f,
            "Unmatched (dropped):      {} messages, {} category rows",
            self.unmatched_messages, self.unmatched_categories
        )?;
        writeln!(f, "Out-of-range (dropped):   {}", self.out_of_range_dropped)?;
        writeln!(f, "Duplicates (dropped):     {}", self.duplicates_dropped)?;
        writeln!(f, "Categories:               {}", self.category_count)?;
        write!(f, "Rows written:             {}", self.rows_written)
    }
}

/// Joins, expands and deduplicates the two sources into the cleaned table.
pub fn clean(
    messages: &[Message],
    categories: &[CategoryLabelSet],
    config: &EtlConfig,
) -> Result<(LabeledDataset, EtlReport)> {
    let mut report = EtlReport {
        messages_read: messages.len(),
        category_rows_read: categories.len(),
        ..EtlReport::default()
    };

    let (joined, stats) = join(messages, categories, config.join_policy)?;
    report.unmatched_messages = stats.unmatched_messages;
    report.unmatched_categories = stats.unmatched_categories;

    let (_, first) = joined
        .first()
        .ok_or_else(|| Error::EmptyDataset("no message matched a category row".to_string()))?;
    let schema = discover_schema(first)?;

    let mut rows = Vec::with_capacity(joined.len());
    for (message, category_row) in joined {
        match expand_labels(category_row, &schema, config.out_of_range)? {
            Some(labels) => rows.push(LabeledMessage {
                message: message.clone(),
                labels,
            }),
            None => report.out_of_range_dropped += 1,
        }
    }
    if report.out_of_range_dropped > 0 {
        tracing::warn!(
            "Dropped {} rows with category values outside 0/1",
            report.out_of_range_dropped
        );
    }

    let (rows, duplicates) = deduplicate(rows);
    report.duplicates_dropped = duplicates;
    report.rows_written = rows.len();
    report.category_count = schema.len();

    Ok((LabeledDataset { schema, rows }, report))
}

pub struct EtlPipeline {
    storage: Storage,
    config: EtlConfig,
}

impl EtlPipeline {
    pub fn new(storage: Storage, config: EtlConfig) -> Self {
        Self { storage, config }
    }

    pub fn run<P, Q>(&self, messages_path: P, categories_path: Q) -> Result<EtlReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        tracing::info!("Loading data...");
        let messages = load_messages(messages_path)?;
        let categories = load_categories(categories_path)?;

        tracing::info!("Cleaning data...");
        let (dataset, report) = clean(&messages, &categories, &self.config)?;

        tracing::info!("Saving data to table '{}'...", self.config.table_name);
        self.storage.write_dataset(&self.config.table_name, &dataset)?;

        Ok(report)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;
    use crate::taxonomy::pack_categories;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> EtlConfig {
        EtlConfig {
            table_name: "message_categories".to_string(),
            join_policy: JoinPolicy::Inner,
            out_of_range: OutOfRangePolicy::Drop,
        }
    }

    #[test]
    fn test_clean_water_scenario() {
        let messages = vec![
            Message::new(1, "Water needed in village", Genre::Direct),
            Message::new(2, "Thank you for the update", Genre::News),
        ];
        let categories = vec![
            CategoryLabelSet::new(1, pack_categories(&["water"])),
            CategoryLabelSet::new(2, pack_categories(&[])),
        ];
        let (dataset, report) = clean(&messages, &categories, &config()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.schema.len(), 36);
        let water = dataset.schema.position("water").unwrap();
        let column: Vec<u8> = dataset.rows.iter().map(|r| r.labels[water]).collect();
        assert_eq!(column, vec![1, 0]);
        assert_eq!(report.rows_written, 2);
    }

    #[test]
    fn test_clean_drops_identical_rows() {
        let messages = vec![
            Message::new(1, "Water needed", Genre::Direct),
            Message::new(1, "Water needed", Genre::Direct),
        ];
        let categories = vec![CategoryLabelSet::new(1, "water-1;food-0")];
        let (dataset, report) = clean(&messages, &categories, &config()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(report.duplicates_dropped, 1);
    }

    #[test]
    fn test_clean_drops_out_of_range_rows() {
        let messages = vec![
            Message::new(1, "a", Genre::Direct),
            Message::new(2, "b", Genre::Direct),
        ];
        let categories = vec![
            CategoryLabelSet::new(1, "related-1;water-0"),
            CategoryLabelSet::new(2, "related-2;water-0"),
        ];
        let (dataset, report) = clean(&messages, &categories, &config()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(report.out_of_range_dropped, 1);
    }

    #[test]
    fn test_nothing_matched() {
        let messages = vec![Message::new(1, "a", Genre::Direct)];
        let categories = vec![CategoryLabelSet::new(2, "water-1")];
        assert!(matches!(
            clean(&messages, &categories, &config()),
            Err(Error::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_pipeline_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let messages_path = dir.path().join("messages.csv");
        let categories_path = dir.path().join("categories.csv");
        fs::write(
            &messages_path,
            "id,message,original,genre\n\
             1,Water needed in village,,direct\n\
             2,Thank you for the update,,news\n\
             2,Thank you for the update,,news\n",
        )
        .unwrap();
        fs::write(
            &categories_path,
            "id,categories\n1,water-1;food-0\n2,water-0;food-0\n",
        )
        .unwrap();

        let db_path = dir.path().join("DisasterResponse.db");
        let pipeline = EtlPipeline::new(Storage::new(&db_path).unwrap(), config());

        let first_report = pipeline.run(&messages_path, &categories_path).unwrap();
        let first = pipeline.storage().load_dataset("message_categories").unwrap();
        let second_report = pipeline.run(&messages_path, &categories_path).unwrap();
        let second = pipeline.storage().load_dataset("message_categories").unwrap();

        assert_eq!(first_report, second_report);
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
        assert_eq!(
            pipeline.storage().row_count("message_categories").unwrap(),
            2
        );
    }
}
