use std::collections::{HashMap, HashSet};

use super::{JoinPolicy, OutOfRangePolicy};
use crate::error::{Error, Result};
use crate::models::{CategoryLabelSet, CategorySchema, LabeledMessage, Message};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    pub unmatched_messages: usize,
    pub unmatched_categories: usize,
}

/// Pairs every message with every category row sharing its id, in message
/// order. Ids present on only one side are dropped under `Inner` and fail
/// under `Strict`.
pub fn join<'a>(
    messages: &'a [Message],
    categories: &'a [CategoryLabelSet],
    policy: JoinPolicy,
) -> Result<(Vec<(&'a Message, &'a CategoryLabelSet)>, JoinStats)> {
    let mut by_id: HashMap<i64, Vec<&CategoryLabelSet>> = HashMap::new();
    for row in categories {
        by_id.entry(row.id).or_default().push(row);
    }
    let message_ids: HashSet<i64> = messages.iter().map(|m| m.id).collect();

    let mut stats = JoinStats::default();
    let mut joined = Vec::new();

    for message in messages {
        match by_id.get(&message.id) {
            Some(rows) => joined.extend(rows.iter().map(|row| (message, *row))),
            None => {
                if policy == JoinPolicy::Strict {
                    return Err(Error::Join {
                        id: message.id,
                        present_in: "messages",
                        missing_from: "categories",
                    });
                }
                stats.unmatched_messages += 1;
            }
        }
    }

    for row in categories {
        if !message_ids.contains(&row.id) {
            if policy == JoinPolicy::Strict {
                return Err(Error::Join {
                    id: row.id,
                    present_in: "categories",
                    missing_from: "messages",
                });
            }
            stats.unmatched_categories += 1;
        }
    }

    if stats.unmatched_messages + stats.unmatched_categories > 0 {
        tracing::warn!(
            "Inner join dropped {} messages and {} category rows without a match",
            stats.unmatched_messages,
            stats.unmatched_categories
        );
    }

    Ok((joined, stats))
}

/// Schema taken from the first row's category order.
pub fn discover_schema(first: &CategoryLabelSet) -> Result<CategorySchema> {
    let names = first.parse()?.into_iter().map(|v| v.name).collect();
    CategorySchema::new(names).map_err(|e| Error::malformed_category(first.id, e.to_string()))
}

/// Expands one packed row against the schema. `Ok(None)` means the row is
/// dropped by the out-of-range policy.
pub fn expand_labels(
    row: &CategoryLabelSet,
    schema: &CategorySchema,
    policy: OutOfRangePolicy,
) -> Result<Option<Vec<u8>>> {
    let mut labels = vec![0u8; schema.len()];

    for value in row.parse()? {
        let position = schema.position(&value.name).ok_or_else(|| {
            Error::malformed_category(
                row.id,
                format!("category '{}' is not in the schema", value.name),
            )
        })?;

        labels[position] = match (value.value, policy) {
            (0, _) => 0,
            (1, _) => 1,
            (_, OutOfRangePolicy::Clamp) => 1,
            (_, OutOfRangePolicy::Drop) => return Ok(None),
            (other, OutOfRangePolicy::Reject) => {
                return Err(Error::malformed_category(
                    row.id,
                    format!("value {} for '{}' is outside 0/1", other, value.name),
                ))
            }
        };
    }

    Ok(Some(labels))
}

/// Drops rows equal in every field to an earlier row; the first stays.
pub fn deduplicate(rows: Vec<LabeledMessage>) -> (Vec<LabeledMessage>, usize) {
    let mut seen = HashSet::new();
    let before = rows.len();
    let kept: Vec<LabeledMessage> = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;

    fn msg(id: i64, text: &str) -> Message {
        Message::new(id, text, Genre::Direct)
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let messages = vec![msg(1, "a"), msg(2, "b"), msg(3, "c")];
        let categories = vec![
            CategoryLabelSet::new(3, "water-1"),
            CategoryLabelSet::new(1, "water-0"),
            CategoryLabelSet::new(9, "water-0"),
        ];
        let (joined, stats) = join(&messages, &categories, JoinPolicy::Inner).unwrap();
        let ids: Vec<i64> = joined.iter().map(|(m, _)| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(stats.unmatched_messages, 1);
        assert_eq!(stats.unmatched_categories, 1);
    }

    #[test]
    fn test_strict_join_fails_on_unmatched() {
        let messages = vec![msg(1, "a"), msg(2, "b")];
        let categories = vec![CategoryLabelSet::new(1, "water-1")];
        let err = join(&messages, &categories, JoinPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::Join { id: 2, .. }));
    }

    #[test]
    fn test_duplicate_ids_cross_join() {
        let messages = vec![msg(1, "a"), msg(1, "a")];
        let categories = vec![
            CategoryLabelSet::new(1, "water-1"),
            CategoryLabelSet::new(1, "water-1"),
        ];
        let (joined, _) = join(&messages, &categories, JoinPolicy::Inner).unwrap();
        assert_eq!(joined.len(), 4);
    }

    #[test]
    fn test_expand_fills_absent_categories_with_zero() {
        let schema = discover_schema(&CategoryLabelSet::new(1, "water-1;food-0;fire-0")).unwrap();
        let labels = expand_labels(
            &CategoryLabelSet::new(2, "fire-1"),
            &schema,
            OutOfRangePolicy::Drop,
        )
        .unwrap();
        assert_eq!(labels, Some(vec![0, 0, 1]));
    }

    #[test]
    fn test_expand_follows_schema_order() {
        let schema = discover_schema(&CategoryLabelSet::new(1, "water-1;food-0")).unwrap();
        let labels = expand_labels(
            &CategoryLabelSet::new(2, "food-1;water-0"),
            &schema,
            OutOfRangePolicy::Drop,
        )
        .unwrap();
        assert_eq!(labels, Some(vec![0, 1]));
    }

    #[test]
    fn test_out_of_range_policies() {
        let schema = discover_schema(&CategoryLabelSet::new(1, "related-1;water-0")).unwrap();
        let row = CategoryLabelSet::new(5, "related-2;water-1");

        assert_eq!(
            expand_labels(&row, &schema, OutOfRangePolicy::Drop).unwrap(),
            None
        );
        assert_eq!(
            expand_labels(&row, &schema, OutOfRangePolicy::Clamp).unwrap(),
            Some(vec![1, 1])
        );
        assert!(matches!(
            expand_labels(&row, &schema, OutOfRangePolicy::Reject),
            Err(Error::MalformedCategory { id: 5, .. })
        ));
    }

    #[test]
    fn test_unknown_category_is_malformed() {
        let schema = discover_schema(&CategoryLabelSet::new(1, "water-1")).unwrap();
        let row = CategoryLabelSet::new(2, "volcano-1");
        assert!(expand_labels(&row, &schema, OutOfRangePolicy::Drop).is_err());
    }

    #[test]
    fn test_deduplicate_keeps_first_full_row_match() {
        let a = LabeledMessage {
            message: msg(1, "water"),
            labels: vec![1],
        };
        let b = LabeledMessage {
            message: msg(1, "water"),
            labels: vec![0],
        };
        let (kept, dropped) = deduplicate(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(kept, vec![a, b]);
        assert_eq!(dropped, 1);
    }
}
