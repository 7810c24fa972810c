//! StackGraph — the in-progress construct graph being assembled.
//!
//! Constructs are appended in declaration order. A construct may only
//! depend on constructs that were declared before it, so the declaration
//! order is always a valid creation order. Logical ids are unique per
//! stack; a second declaration under the same id is rejected, which is
//! where table id collisions surface.

use std::collections::BTreeMap;

use budget_core::{ResourceDescriptor, ResourceKind};
use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StackError, StackResult};

/// Non-owning reference to a declared construct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConstructId(String);

impl ConstructId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token standing in for an attribute generated at provisioning time
    /// (e.g. `${BudgetLambda.arn}`).
    pub fn attr_ref(&self, attribute: &str) -> String {
        format!("${{{}.{}}}", self.0, attribute)
    }
}

impl std::fmt::Display for ConstructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Externally observable value emitted by the stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackOutput {
    pub name: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackGraph {
    name: String,
    metadata: BTreeMap<String, String>,
    constructs: Vec<ResourceDescriptor>,
    positions: BTreeMap<String, usize>,
    outputs: Vec<StackOutput>,
}

impl StackGraph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            metadata: BTreeMap::new(),
            constructs: Vec::new(),
            positions: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Declare a construct. Fails on a duplicate logical id or on a
    /// dependency that has not been declared yet.
    pub fn add(&mut self, descriptor: ResourceDescriptor) -> StackResult<ConstructId> {
        let id = descriptor.logical_id.clone();
        if self.positions.contains_key(&id) {
            return Err(StackError::DuplicateConstruct(id));
        }
        if let Some(missing) = descriptor
            .depends_on
            .iter()
            .find(|dep| !self.positions.contains_key(dep.as_str()))
        {
            return Err(StackError::MissingDependency {
                construct: id,
                dependency: missing.clone(),
            });
        }

        debug!(
            construct = %id,
            kind = descriptor.kind.label(),
            deps = descriptor.depends_on.len(),
            "declared construct"
        );
        self.positions.insert(id.clone(), self.constructs.len());
        self.constructs.push(descriptor);
        Ok(ConstructId(id))
    }

    /// Emit an output whose value is produced by `source`.
    pub fn add_output(
        &mut self,
        name: &str,
        source: &ConstructId,
        value: String,
        description: &str,
    ) -> StackResult<()> {
        if !self.positions.contains_key(source.as_str()) {
            return Err(StackError::MissingDependency {
                construct: name.to_string(),
                dependency: source.to_string(),
            });
        }
        if self.outputs.iter().any(|o| o.name == name) {
            return Err(StackError::DuplicateConstruct(name.to_string()));
        }
        self.outputs.push(StackOutput {
            name: name.to_string(),
            value,
            description: description.to_string(),
        });
        Ok(())
    }

    pub fn get(&self, id: &ConstructId) -> Option<&ResourceDescriptor> {
        self.get_by_name(id.as_str())
    }

    pub fn get_by_name(&self, logical_id: &str) -> Option<&ResourceDescriptor> {
        self.positions
            .get(logical_id)
            .map(|&pos| &self.constructs[pos])
    }

    /// Position of a construct in declaration order.
    pub fn position(&self, logical_id: &str) -> Option<usize> {
        self.positions.get(logical_id).copied()
    }

    /// All constructs in declaration order.
    pub fn constructs(&self) -> &[ResourceDescriptor] {
        &self.constructs
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDescriptor> {
        self.constructs.iter().filter(move |c| c.kind == kind)
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn outputs(&self) -> &[StackOutput] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Deterministic JSON document describing the whole stack.
    pub fn to_template(&self) -> Value {
        let resources: serde_json::Map<String, Value> = self
            .constructs
            .iter()
            .map(|c| {
                (
                    c.logical_id.clone(),
                    json!({
                        "kind": c.kind,
                        "attributes": c.attributes,
                        "depends_on": c.depends_on,
                    }),
                )
            })
            .collect();
        let outputs: serde_json::Map<String, Value> = self
            .outputs
            .iter()
            .map(|o| {
                (
                    o.name.clone(),
                    json!({ "value": o.value, "description": o.description }),
                )
            })
            .collect();
        let order: Vec<&str> = self.constructs.iter().map(|c| c.logical_id.as_str()).collect();

        json!({
            "stack": self.name,
            "metadata": self.metadata,
            "declaration_order": order,
            "resources": resources,
            "outputs": outputs,
        })
    }

    /// Hex SHA-256 of the serialized template.
    pub fn fingerprint(&self) -> StackResult<String> {
        let bytes = serde_json::to_vec(&self.to_template())
            .map_err(|e| StackError::Serialize(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
