use serde::{Deserialize, Serialize};

use super::classifier::ClassifierParams;
use super::features::{TfidfVectorizer, VectorizerParams};
use super::multilabel::MultiLabelClassifier;
use super::tokenizer::tokenize;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineParams {
    pub vectorizer: VectorizerParams,
    pub classifier: ClassifierParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub category: String,
    pub label: u8,
    pub probability: f64,
}

/// Feature stage plus the per-category decision components, fitted
/// together and applied together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPipeline {
    categories: Vec<String>,
    params: PipelineParams,
    threshold: f64,
    vectorizer: TfidfVectorizer,
    classifier: MultiLabelClassifier,
}

impl TextPipeline {
    pub fn fit(
        texts: &[&str],
        labels: &[Vec<u8>],
        categories: &[String],
        params: PipelineParams,
        threshold: f64,
    ) -> Result<Self> {
        if texts.len() != labels.len() {
            return Err(Error::Config(format!(
                "{} texts but {} label rows",
                texts.len(),
                labels.len()
            )));
        }
        if let Some(row) = labels.iter().find(|row| row.len() != categories.len()) {
            return Err(Error::Config(format!(
                "label row has {} values for {} categories",
                row.len(),
                categories.len()
            )));
        }

        let vectorizer = TfidfVectorizer::fit(texts, params.vectorizer);
        let features = vectorizer.transform_many(texts);
        let classifier = MultiLabelClassifier::fit(
            &features,
            labels,
            categories.len(),
            vectorizer.dim(),
            &params.classifier,
        );

        Ok(Self {
            categories: categories.to_vec(),
            params,
            threshold,
            vectorizer,
            classifier,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Per-category probabilities in category order. Text without any
    /// token scores zero everywhere.
    pub fn predict_proba(&self, text: &str) -> Vec<f64> {
        if tokenize(text).is_empty() {
            return vec![0.0; self.categories.len()];
        }
        let x = self.vectorizer.transform(text);
        self.classifier.predict_proba(&x)
    }

    pub fn predict(&self, text: &str) -> Vec<u8> {
        if tokenize(text).is_empty() {
            return vec![0; self.categories.len()];
        }
        let x = self.vectorizer.transform(text);
        self.classifier.predict(&x, self.threshold)
    }

    pub fn predict_many(&self, texts: &[&str]) -> Vec<Vec<u8>> {
        texts.iter().map(|t| self.predict(t)).collect()
    }

    /// Labels and probabilities from a single tokenize and transform pass.
    pub fn classify(&self, text: &str) -> Vec<CategoryPrediction> {
        let (labels, probabilities) = if tokenize(text).is_empty() {
            (
                vec![0; self.categories.len()],
                vec![0.0; self.categories.len()],
            )
        } else {
            let x = self.vectorizer.transform(text);
            (
                self.classifier.predict(&x, self.threshold),
                self.classifier.predict_proba(&x),
            )
        };

        self.categories
            .iter()
            .zip(labels)
            .zip(probabilities)
            .map(|((category, label), probability)| CategoryPrediction {
                category: category.clone(),
                label,
                probability,
            })
            .collect()
    }

    /// Structural checks for a deserialized pipeline.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.vectorizer.validate()?;
        if self.classifier.len() != self.categories.len() {
            return Err(format!(
                "{} decision components for {} categories",
                self.classifier.len(),
                self.categories.len()
            ));
        }
        let dim = self.vectorizer.dim();
        for (name, estimator) in self.categories.iter().zip(self.classifier.estimators()) {
            if let Some(width) = estimator.dim() {
                if width != dim {
                    return Err(format!(
                        "category '{}' expects {} features, vectorizer produces {}",
                        name, width, dim
                    ));
                }
            }
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("decision threshold {} out of range", self.threshold));
        }
        Ok(())
    }
}
