use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

pub const SEGMENT_DELIMITER: char = ';';
pub const VALUE_DELIMITER: char = '-';

/// Ordered category names. The order is the one every stage uses for
/// columns, label vectors and predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
    names: Vec<String>,
}

impl CategorySchema {
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &names {
            if name.trim().is_empty() {
                return Err(Error::Config("category name must not be empty".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("duplicate category '{}'", name)));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Raw value as found in a packed segment, before the out-of-range policy
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryValue {
    pub name: String,
    pub value: u32,
}

/// One row of the categories source: an id and its packed label string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLabelSet {
    pub id: i64,
    pub packed: String,
}

impl CategoryLabelSet {
    pub fn new(id: i64, packed: impl Into<String>) -> Self {
        Self {
            id,
            packed: packed.into(),
        }
    }

    /// Splits the packed string into `(name, value)` pairs in source order.
    ///
    /// The value is separated by the last `-` of a segment so hyphenated
    /// names survive. Repeated names and non-integer values are malformed.
    pub fn parse(&self) -> Result<Vec<CategoryValue>> {
        let mut values = Vec::new();
        let mut seen = HashSet::new();

        for segment in self.packed.split(SEGMENT_DELIMITER) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (name, raw_value) = segment.rsplit_once(VALUE_DELIMITER).ok_or_else(|| {
                Error::malformed_category(self.id, format!("segment '{}' has no value", segment))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::malformed_category(
                    self.id,
                    format!("segment '{}' has no name", segment),
                ));
            }
            let value: u32 = raw_value.trim().parse().map_err(|_| {
                Error::malformed_category(
                    self.id,
                    format!("segment '{}' has a non-integer value", segment),
                )
            })?;
            if !seen.insert(name.to_string()) {
                return Err(Error::malformed_category(
                    self.id,
                    format!("category '{}' appears more than once", name),
                ));
            }

            values.push(CategoryValue {
                name: name.to_string(),
                value,
            });
        }

        if values.is_empty() {
            return Err(Error::malformed_category(self.id, "no category segments"));
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{pack_categories, CATEGORY_COUNT, DISASTER_CATEGORIES};

    #[test]
    fn test_parse_full_category_string() {
        let set = CategoryLabelSet::new(2, pack_categories(&["water", "food"]));
        let values = set.parse().unwrap();
        assert_eq!(values.len(), CATEGORY_COUNT);
        assert!(values.iter().all(|v| v.value <= 1));
        for (parsed, expected) in values.iter().zip(DISASTER_CATEGORIES) {
            assert_eq!(parsed.name, expected);
        }
        let water = values.iter().find(|v| v.name == "water").unwrap();
        assert_eq!(water.value, 1);
    }

    #[test]
    fn test_hyphenated_name_uses_last_delimiter() {
        let set = CategoryLabelSet::new(1, "search-and-rescue-1;water-0");
        let values = set.parse().unwrap();
        assert_eq!(values[0].name, "search-and-rescue");
        assert_eq!(values[0].value, 1);
    }

    #[test]
    fn test_out_of_range_value_is_kept_raw() {
        let set = CategoryLabelSet::new(1, "related-2;water-0");
        let values = set.parse().unwrap();
        assert_eq!(values[0].value, 2);
    }

    #[test]
    fn test_malformed_segments() {
        for packed in ["water", "water-x", "-1", "water-1;water-0", "", "water-1.5"] {
            let err = CategoryLabelSet::new(9, packed).parse().unwrap_err();
            assert!(
                matches!(err, Error::MalformedCategory { id: 9, .. }),
                "{} -> {:?}",
                packed,
                err
            );
        }
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        assert!(CategorySchema::new(vec!["a".into(), "a".into()]).is_err());
        let schema = CategorySchema::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(schema.position("b"), Some(1));
    }
}
