//! Artifact location references.
//!
//! The compute artifact is built and uploaded elsewhere; the stack only
//! refers to the bucket and object key it is staged under.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object key the packaged artifact is uploaded to.
pub const DEFAULT_ARTIFACT_KEY: &str = "dist.zip";

/// Handler path inside the packaged artifact.
pub const DEFAULT_ENTRY_POINT: &str = "dist/handlers/index.lambdaHandler";

/// `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub bucket: String,
    pub key: String,
}

impl ArtifactLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
