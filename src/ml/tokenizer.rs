use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::taxonomy::is_request_verb;

pub const URL_PLACEHOLDER: &str = "urlplaceholder";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url pattern is valid")
});

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("sentence pattern is valid"));

fn normalize_text(input: &str) -> String {
    input.nfc().collect()
}

/// Lowercased alphanumeric tokens with URLs collapsed to a placeholder and
/// plurals folded. Text is NFC-normalized first, so composed and
/// decomposed spellings of a word give the same token.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize_text(text);
    let text = URL_PATTERN.replace_all(&normalized, format!(" {} ", URL_PLACEHOLDER));

    text.split_word_bounds()
        .flat_map(|word| word.split(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(|t| stem(&t.to_lowercase()))
        .collect()
}

/// Light plural folding: "supplies" -> "supply", "tents" -> "tent".
fn stem(token: &str) -> String {
    let len = token.chars().count();
    if len > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    if len > 3
        && token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Word n-grams from 1 up to `ngram_max`, joined with a single space.
pub fn ngrams(tokens: &[String], ngram_max: usize) -> Vec<String> {
    let mut terms = tokens.to_vec();
    for n in 2..=ngram_max.max(1) {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

/// True when any sentence opens with a request verb or a retweet marker.
pub fn starts_with_request_verb(text: &str) -> bool {
    SENTENCE_BOUNDARY
        .split(text)
        .filter_map(|sentence| tokenize(sentence).into_iter().next())
        .any(|first| first == "rt" || is_request_verb(&first))
}
