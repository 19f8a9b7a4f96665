pub mod app;
pub mod config;
pub mod error;
pub mod etl;
pub mod ml;
pub mod models;
pub mod storage;
pub mod taxonomy;
pub mod training;

pub use app::{build_router, AppContext};
pub use config::{Config, EtlConfig, ServiceConfig, TrainingConfig};
pub use error::{Error, Result};
pub use etl::{EtlPipeline, EtlReport, JoinPolicy, OutOfRangePolicy};
pub use ml::{ParamGrid, Scoring, TextPipeline};
pub use storage::{ModelArtifact, Storage};
pub use training::{TrainingOutcome, TrainingPipeline};
