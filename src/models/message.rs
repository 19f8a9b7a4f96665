use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel a message arrived through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Direct,
    News,
    Social,
    Other(String),
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Genre::Direct => write!(f, "direct"),
            Genre::News => write!(f, "news"),
            Genre::Social => write!(f, "social"),
            Genre::Other(tag) => write!(f, "{}", tag),
        }
    }
}

impl Genre {
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        match tag.as_str() {
            "direct" => Genre::Direct,
            "news" => Genre::News,
            "social" => Genre::Social,
            _ => Genre::Other(tag),
        }
    }
}

impl FromStr for Genre {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Genre::from_tag(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// English text, the one the classifier sees.
    pub message: String,
    pub original: Option<String>,
    pub genre: Genre,
}

impl Message {
    pub fn new(id: i64, message: impl Into<String>, genre: Genre) -> Self {
        Self {
            id,
            message: message.into(),
            original: None,
            genre,
        }
    }

    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        let original = original.into();
        self.original = if original.trim().is_empty() {
            None
        } else {
            Some(original)
        };
        self
    }
}
