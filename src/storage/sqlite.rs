use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{CategorySchema, Genre, LabeledDataset, LabeledMessage, Message};

/// Columns every message table starts with, before the category columns.
pub const FIXED_COLUMNS: [&str; 4] = ["id", "message", "original", "genre"];

pub struct Storage {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Replaces `table` with the dataset. The drop, create and inserts run
    /// in one transaction, so a failed write leaves the previous table.
    pub fn write_dataset(&self, table: &str, dataset: &LabeledDataset) -> Result<usize> {
        for name in dataset.schema.names() {
            if FIXED_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                return Err(Error::Config(format!(
                    "category '{}' collides with a fixed column",
                    name
                )));
            }
        }

        let table_ident = quote_ident(table);
        let mut columns = vec![
            "id INTEGER NOT NULL".to_string(),
            "message TEXT NOT NULL".to_string(),
            "original TEXT".to_string(),
            "genre TEXT NOT NULL".to_string(),
        ];
        columns.extend(
            dataset
                .schema
                .names()
                .iter()
                .map(|name| format!("{} INTEGER NOT NULL", quote_ident(name))),
        );

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};\nCREATE TABLE {table} ({columns});",
            table = table_ident,
            columns = columns.join(", ")
        ))?;

        let placeholders = vec!["?"; FIXED_COLUMNS.len() + dataset.schema.len()].join(", ");
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                table_ident, placeholders
            ))?;

            for row in &dataset.rows {
                let mut values = vec![
                    Value::Integer(row.message.id),
                    Value::Text(row.message.message.clone()),
                    row.message
                        .original
                        .clone()
                        .map(Value::Text)
                        .unwrap_or(Value::Null),
                    Value::Text(row.message.genre.to_string()),
                ];
                values.extend(row.labels.iter().map(|&l| Value::Integer(i64::from(l))));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Wrote {} rows with {} categories to table '{}'",
            dataset.rows.len(),
            dataset.schema.len(),
            table
        );
        Ok(dataset.rows.len())
    }

    /// Category columns of `table`, in column order.
    pub fn category_schema(&self, table: &str) -> Result<CategorySchema> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(Error::EmptyDataset(format!("table '{}' does not exist", table)));
        }
        if columns.len() < FIXED_COLUMNS.len()
            || columns
                .iter()
                .zip(FIXED_COLUMNS)
                .any(|(c, expected)| !c.eq_ignore_ascii_case(expected))
        {
            return Err(Error::Config(format!(
                "table '{}' does not start with columns {:?}",
                table, FIXED_COLUMNS
            )));
        }

        CategorySchema::new(columns[FIXED_COLUMNS.len()..].to_vec())
    }

    pub fn load_dataset(&self, table: &str) -> Result<LabeledDataset> {
        let schema = self.category_schema(table)?;
        let width = schema.len();

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))?;

        let raw_rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let message: String = row.get(1)?;
            let original: Option<String> = row.get(2)?;
            let genre: String = row.get(3)?;
            let mut labels = Vec::with_capacity(width);
            for i in 0..width {
                labels.push(row.get::<_, i64>(FIXED_COLUMNS.len() + i)?);
            }
            Ok((id, message, original, genre, labels))
        })?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let (id, text, original, genre, raw_labels) = raw?;
            let labels = raw_labels
                .into_iter()
                .map(|v| match v {
                    0 | 1 => Ok(v as u8),
                    other => Err(Error::malformed_category(
                        id,
                        format!("stored label value {} outside 0/1", other),
                    )),
                })
                .collect::<Result<Vec<u8>>>()?;

            let mut message = Message::new(id, text, Genre::from_tag(&genre));
            message.original = original;
            rows.push(LabeledMessage { message, labels });
        }

        tracing::info!(
            "Loaded {} rows with {} categories from table '{}'",
            rows.len(),
            width,
            table
        );
        Ok(LabeledDataset { schema, rows })
    }

    pub fn genre_counts(&self, table: &str) -> Result<Vec<GenreCount>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT genre, COUNT(*) FROM {} GROUP BY genre ORDER BY genre",
            quote_ident(table)
        ))?;
        let counts = stmt.query_map([], |row| {
            Ok(GenreCount {
                genre: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?;
        counts
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Positive count per category, in schema order.
    pub fn category_counts(&self, table: &str) -> Result<Vec<CategoryCount>> {
        let schema = self.category_schema(table)?;
        if schema.is_empty() {
            return Ok(Vec::new());
        }

        let sums = schema
            .names()
            .iter()
            .map(|name| format!("COALESCE(SUM({}), 0)", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let values: Vec<i64> = self.conn.query_row(
            &format!("SELECT {} FROM {}", sums, quote_ident(table)),
            [],
            |row| {
                (0..schema.len())
                    .map(|i| row.get::<_, i64>(i))
                    .collect::<rusqlite::Result<Vec<i64>>>()
            },
        )?;

        Ok(schema
            .names()
            .iter()
            .zip(values)
            .map(|(name, count)| CategoryCount {
                category: name.clone(),
                count: count.max(0) as u64,
            })
            .collect())
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
