pub mod classifier;
pub mod features;
pub mod grid;
pub mod metrics;
pub mod multilabel;
pub mod pipeline;
pub mod split;
pub mod tokenizer;

pub use classifier::{BinaryClassifier, ClassifierParams};
pub use features::{SparseVector, TfidfVectorizer, VectorizerParams};
pub use grid::{GridSearch, GridSearchResult, ParamGrid, Scoring};
pub use metrics::EvaluationReport;
pub use multilabel::MultiLabelClassifier;
pub use pipeline::{CategoryPrediction, PipelineParams, TextPipeline};
