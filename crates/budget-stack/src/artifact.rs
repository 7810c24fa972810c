//! Artifact store provisioning.

use budget_core::{ArtifactLocation, RemovalPolicy, ResourceDescriptor, ResourceKind};
use serde_json::json;

use crate::error::StackResult;
use crate::graph::{ConstructId, StackGraph};

/// The disposable bucket the compute artifact is staged in.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactStore {
    pub id: ConstructId,
    pub bucket_name: String,
}

impl ArtifactStore {
    /// Location of an object inside this store.
    pub fn location(&self, key: &str) -> ArtifactLocation {
        ArtifactLocation::new(&self.bucket_name, key)
    }
}

/// Physical bucket name for a stack prefix (`Budget` → `budget-lambda-bucket`).
pub fn bucket_name(prefix: &str) -> String {
    format!("{prefix}-lambda-bucket").to_lowercase()
}

/// Declare the artifact bucket. Depends on nothing.
pub fn provision(graph: &mut StackGraph, prefix: &str) -> StackResult<ArtifactStore> {
    let bucket_name = bucket_name(prefix);
    let descriptor = ResourceDescriptor::new(format!("{prefix}Bucket"), ResourceKind::ArtifactBucket)
        .with_attr("bucket_name", bucket_name.as_str())
        .with_attr("removal_policy", json!(RemovalPolicy::Destroy))
        .with_attr("auto_delete_objects", true);
    let id = graph.add(descriptor)?;
    Ok(ArtifactStore { id, bucket_name })
}
