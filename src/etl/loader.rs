use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{CategoryLabelSet, Genre, Message};

/// Reads the messages source: header `id,message,original,genre`. Only `id`
/// and `message` are required; columns may come in any order.
pub fn load_messages<P: AsRef<Path>>(path: P) -> Result<Vec<Message>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let messages = read_messages(file, &path.display().to_string())?;
    tracing::info!("Loaded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}

/// Reads the categories source: header `id,categories`.
pub fn load_categories<P: AsRef<Path>>(path: P) -> Result<Vec<CategoryLabelSet>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let categories = read_categories(file, &path.display().to_string())?;
    tracing::info!(
        "Loaded {} category rows from {}",
        categories.len(),
        path.display()
    );
    Ok(categories)
}

pub fn read_messages<R: Read>(reader: R, source_name: &str) -> Result<Vec<Message>> {
    let mut reader = ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = reader.headers()?.clone();
    let id_col = require_column(&headers, "id", source_name)?;
    let message_col = require_column(&headers, "message", source_name)?;
    let original_col = find_column(&headers, "original");
    let genre_col = find_column(&headers, "genre");

    let mut messages = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record_line(&record);
        let id = parse_id(&record, id_col, source_name, line)?;
        let text = record.get(message_col).unwrap_or_default();
        let genre = genre_col
            .and_then(|c| record.get(c))
            .map(Genre::from_tag)
            .unwrap_or_else(|| Genre::Other(String::new()));

        let mut message = Message::new(id, text, genre);
        if let Some(original) = original_col.and_then(|c| record.get(c)) {
            message = message.with_original(original);
        }
        messages.push(message);
    }

    Ok(messages)
}

pub fn read_categories<R: Read>(reader: R, source_name: &str) -> Result<Vec<CategoryLabelSet>> {
    let mut reader = ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = reader.headers()?.clone();
    let id_col = require_column(&headers, "id", source_name)?;
    let categories_col = require_column(&headers, "categories", source_name)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record_line(&record);
        let id = parse_id(&record, id_col, source_name, line)?;
        let packed = record.get(categories_col).unwrap_or_default();
        rows.push(CategoryLabelSet::new(id, packed));
    }

    Ok(rows)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn require_column(headers: &StringRecord, name: &str, source_name: &str) -> Result<usize> {
    find_column(headers, name).ok_or_else(|| Error::MalformedInput {
        source_name: source_name.to_string(),
        line: 1,
        reason: format!("missing '{}' column", name),
    })
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_id(record: &StringRecord, column: usize, source_name: &str, line: u64) -> Result<i64> {
    let raw = record.get(column).unwrap_or_default().trim();
    raw.parse().map_err(|_| Error::MalformedInput {
        source_name: source_name.to_string(),
        line,
        reason: format!("id '{}' is not an integer", raw),
    })
}
