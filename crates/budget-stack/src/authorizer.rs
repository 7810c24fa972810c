//! Token authorizer backed by the shared compute principal.
//!
//! The authorizer only registers the policy. Requests without a valid
//! token are rejected by the gateway before they reach the function.

use budget_core::{ResourceDescriptor, ResourceKind};

use crate::compute::ComputePrincipal;
use crate::error::StackResult;
use crate::graph::{ConstructId, StackGraph};

pub const DEFAULT_IDENTITY_HEADER: &str = "Authorization";
pub const DEFAULT_CACHE_TTL_SECS: u32 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenAuthorizer {
    pub id: ConstructId,
    pub name: String,
    /// The principal invoked in authorizer mode.
    pub handler: ConstructId,
    pub identity_source: String,
    pub cache_ttl_secs: u32,
}

/// Wrap `principal` as a token authorizer. No new function is declared.
pub fn provision(
    graph: &mut StackGraph,
    prefix: &str,
    principal: &ComputePrincipal,
    identity_header: &str,
    cache_ttl_secs: u32,
) -> StackResult<TokenAuthorizer> {
    let name = format!("{prefix}Authorizer");
    let identity_source = format!("method.request.header.{identity_header}");
    let descriptor = ResourceDescriptor::new(name.clone(), ResourceKind::Authorizer)
        .with_attr("authorizer_type", "TOKEN")
        .with_attr("handler", principal.arn())
        .with_attr("identity_source", identity_source.as_str())
        .with_attr("results_cache_ttl_secs", cache_ttl_secs)
        .depends_on(principal.id.as_str());
    let id = graph.add(descriptor)?;

    Ok(TokenAuthorizer {
        id,
        name,
        handler: principal.id.clone(),
        identity_source,
        cache_ttl_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{artifact, compute};
    use budget_core::FunctionRuntime;
    use std::collections::BTreeMap;

    #[test]
    fn reuses_the_shared_principal() {
        let mut graph = StackGraph::new("s");
        let store = artifact::provision(&mut graph, "Budget").unwrap();
        let principal = compute::provision(
            &mut graph,
            "Budget",
            &store,
            compute::FunctionSpec {
                runtime: FunctionRuntime::Nodejs20,
                artifact_key: "dist.zip".into(),
                entry_point: "dist/handlers/index.lambdaHandler".into(),
                environment: BTreeMap::new(),
            },
        )
        .unwrap();

        let auth = provision(
            &mut graph,
            "Budget",
            &principal,
            DEFAULT_IDENTITY_HEADER,
            DEFAULT_CACHE_TTL_SECS,
        )
        .unwrap();

        assert_eq!(auth.handler, principal.id);
        assert_eq!(auth.identity_source, "method.request.header.Authorization");
        assert_eq!(graph.count_of(ResourceKind::Function), 1);
        assert_eq!(graph.count_of(ResourceKind::Authorizer), 1);

        let desc = graph.get(&auth.id).unwrap();
        assert_eq!(desc.attr_str("handler"), Some("${BudgetLambda.arn}"));
        assert_eq!(desc.depends_on, vec!["BudgetLambda"]);
    }
}
