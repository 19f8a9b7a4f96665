pub mod pipeline;

pub use pipeline::{TrainingOutcome, TrainingPipeline};
