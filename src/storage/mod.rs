pub mod artifact;
pub mod sqlite;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use sqlite::{CategoryCount, GenreCount, Storage};
