use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::tokenizer::{ngrams, starts_with_request_verb, tokenize};

/// Sparse feature vector, sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub ngram_max: usize,
    /// Terms must occur in at least this many documents.
    pub min_df: usize,
    /// Terms occurring in more than this share of documents are dropped.
    pub max_df: f64,
    pub max_features: Option<usize>,
    pub use_idf: bool,
    pub sublinear_tf: bool,
    /// Appends one binary feature: a sentence opens with a request verb.
    pub starting_verb: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_max: 1,
            min_df: 1,
            max_df: 1.0,
            max_features: None,
            use_idf: true,
            sublinear_tf: false,
            starting_verb: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit(texts: &[&str], params: VectorizerParams) -> Self {
        let total_docs = texts.len();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_freq: BTreeMap<String, usize> = BTreeMap::new();

        for text in texts {
            let terms = ngrams(&tokenize(text), params.ngram_max);
            for term in &terms {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = terms.into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_docs = params.max_df * total_docs as f64;
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= params.min_df && (*df as f64) <= max_docs)
            .collect();

        if let Some(limit) = params.max_features {
            // Most frequent terms first, alphabetical among equals
            kept.sort_by(|a, b| {
                let fa = term_freq.get(&a.0).copied().unwrap_or(0);
                let fb = term_freq.get(&b.0).copied().unwrap_or(0);
                fb.cmp(&fa).then_with(|| a.0.cmp(&b.0))
            });
            kept.truncate(limit);
            kept.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let n = total_docs as f64;
        let idf = kept
            .iter()
            .map(|(_, df)| {
                if params.use_idf {
                    ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0
                } else {
                    1.0
                }
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();

        let vectorizer = Self {
            params,
            vocabulary,
            idf,
        };
        tracing::debug!(
            "Fitted vectorizer on {} documents, vocabulary size {}",
            total_docs,
            vectorizer.vocabulary.len()
        );
        vectorizer
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Width of the vectors `transform` produces.
    pub fn dim(&self) -> usize {
        self.vocabulary.len() + usize::from(self.params.starting_verb)
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let terms = ngrams(&tokenize(text), self.params.ngram_max);

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in &terms {
            if let Some(&idx) = self.vocabulary.get(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, count)| {
                let tf = if self.params.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                (idx, tf * self.idf[idx])
            })
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut vector {
                *v /= norm;
            }
        }

        if self.params.starting_verb && starts_with_request_verb(text) {
            vector.push((self.vocabulary.len(), 1.0));
        }

        vector
    }

    pub fn transform_many(&self, texts: &[&str]) -> Vec<SparseVector> {
        texts.iter().map(|t| self.transform(t)).collect()
    }

    /// Structural checks for a deserialized vectorizer.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(format!(
                "vectorizer has {} idf weights for {} terms",
                self.idf.len(),
                self.vocabulary.len()
            ));
        }
        if self.vocabulary.values().any(|&idx| idx >= self.idf.len()) {
            return Err("vectorizer vocabulary index out of range".to_string());
        }
        Ok(())
    }
}
