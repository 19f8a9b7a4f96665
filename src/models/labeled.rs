use serde::{Deserialize, Serialize};

use super::category::CategorySchema;
use super::message::Message;

/// A message joined with its expanded labels, one value per schema column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledMessage {
    pub message: Message,
    pub labels: Vec<u8>,
}

impl LabeledMessage {
    pub fn text(&self) -> &str {
        &self.message.message
    }
}

/// The cleaned table: schema plus rows whose label vectors all match it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    pub schema: CategorySchema,
    pub rows: Vec<LabeledMessage>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.rows.iter().map(LabeledMessage::text).collect()
    }

    pub fn label_matrix(&self) -> Vec<Vec<u8>> {
        self.rows.iter().map(|r| r.labels.clone()).collect()
    }

    /// Positive count per category, in schema order.
    pub fn category_counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.schema.len()];
        for row in &self.rows {
            for (count, &label) in counts.iter_mut().zip(&row.labels) {
                *count += u64::from(label);
            }
        }
        counts
    }
}
