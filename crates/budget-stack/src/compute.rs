//! Compute principal provisioning.
//!
//! Exactly one function is declared per stack. It is created from the
//! artifact staged in the [`ArtifactStore`], so the store must already be
//! declared; every later consumer (table grants, authorizer, route
//! integrations) holds a reference to this one principal.

use std::collections::BTreeMap;

use budget_core::{ArtifactLocation, FunctionRuntime, LogicalTable, ResourceDescriptor, ResourceKind};
use serde_json::json;
use tracing::debug;

use crate::artifact::ArtifactStore;
use crate::error::{StackError, StackResult};
use crate::graph::{ConstructId, StackGraph};

/// Name of the output carrying the direct-invocation URL.
pub const FUNCTION_URL_OUTPUT: &str = "LambdaFunctionUrl";

/// The function that runs the business logic.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputePrincipal {
    pub id: ConstructId,
    pub name: String,
    pub artifact_location: ArtifactLocation,
    pub entry_point: String,
    pub runtime: FunctionRuntime,
    pub environment: BTreeMap<String, String>,
}

impl ComputePrincipal {
    /// Token for the ARN generated at provisioning time.
    pub fn arn(&self) -> String {
        self.id.attr_ref("arn")
    }
}

/// Inputs for [`provision`].
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub runtime: FunctionRuntime,
    pub artifact_key: String,
    pub entry_point: String,
    pub environment: BTreeMap<String, String>,
}

/// Environment variable naming a table: `Transactions` → `TRANSACTIONS_TABLE`,
/// `user-settings` → `USER_SETTINGS_TABLE`.
///
/// Anything outside `[A-Z0-9_]` becomes `_`; a name that would not start
/// with a letter gets a `TABLE_` prefix.
pub fn table_env_var(table_id: &str) -> String {
    let stem: String = table_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if stem.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("{stem}_TABLE")
    } else {
        format!("TABLE_{stem}_TABLE")
    }
}

/// Table-name variables for every table, plus `DEFAULT_USER_ID` when given.
///
/// Two distinct table ids that map to the same variable are an error.
/// Repeated ids are left to the graph, which rejects the second table.
pub fn table_environment(
    tables: &[LogicalTable],
    default_user_id: Option<&str>,
) -> StackResult<BTreeMap<String, String>> {
    let mut env: BTreeMap<String, String> = BTreeMap::new();
    for t in tables {
        let var = table_env_var(&t.id);
        match env.get(&var) {
            Some(first) if first != &t.id => {
                return Err(StackError::DuplicateEnvVar {
                    var,
                    first: first.clone(),
                    second: t.id.clone(),
                });
            }
            Some(_) => {}
            None => {
                env.insert(var, t.id.clone());
            }
        }
    }
    if let Some(user) = default_user_id {
        env.insert("DEFAULT_USER_ID".to_string(), user.to_string());
    }
    Ok(env)
}

/// Declare the compute principal from an artifact in `store`.
pub fn provision(
    graph: &mut StackGraph,
    prefix: &str,
    store: &ArtifactStore,
    spec: FunctionSpec,
) -> StackResult<ComputePrincipal> {
    let name = format!("{prefix}Lambda");
    let artifact_location = store.location(&spec.artifact_key);

    let descriptor = ResourceDescriptor::new(name.clone(), ResourceKind::Function)
        .with_attr("function_name", name.as_str())
        .with_attr("runtime", spec.runtime.identifier())
        .with_attr("handler", spec.entry_point.as_str())
        .with_attr(
            "code",
            json!({
                "bucket": store.id.attr_ref("bucket_name"),
                "key": artifact_location.key,
            }),
        )
        .with_attr("environment", json!(spec.environment))
        .depends_on(store.id.as_str());
    let id = graph.add(descriptor)?;
    debug!(function = %name, artifact = %artifact_location, "compute principal declared");

    Ok(ComputePrincipal {
        id,
        name,
        artifact_location,
        entry_point: spec.entry_point,
        runtime: spec.runtime,
        environment: spec.environment,
    })
}

/// Expose the principal through an unauthenticated direct-invocation URL
/// and emit its address as [`FUNCTION_URL_OUTPUT`].
pub fn function_url(
    graph: &mut StackGraph,
    prefix: &str,
    principal: &ComputePrincipal,
) -> StackResult<ConstructId> {
    let descriptor = ResourceDescriptor::new(format!("{prefix}LambdaUrl"), ResourceKind::FunctionUrl)
        .with_attr("target_function", principal.arn())
        .with_attr("auth_type", "NONE")
        .depends_on(principal.id.as_str());
    let id = graph.add(descriptor)?;
    graph.add_output(
        FUNCTION_URL_OUTPUT,
        &id,
        id.attr_ref("url"),
        "The URL of the Lambda Function",
    )?;
    Ok(id)
}
