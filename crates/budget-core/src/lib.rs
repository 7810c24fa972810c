pub mod artifact;
pub mod config;
pub mod types;

pub use artifact::ArtifactLocation;
pub use config::StackConfig;
pub use types::*;
