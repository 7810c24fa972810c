//! Stack assembly — runs the provisioners in dependency order.
//!
//! ```text
//! artifact store ──► compute principal ──► authorizer (gateway-with-auth)
//!                          │                    │
//!                          ├──► tables + grants │
//!                          └──► routing tree ◄──┘
//! ```
//!
//! Each step reads identifiers produced by the previous ones, so the
//! order is fixed. The assembler owns the principal and the authorizer;
//! tables and routes only hold their construct ids.

use std::collections::BTreeMap;

use budget_core::{Revision, StackConfig};
use tracing::{info, warn};

use crate::artifact::{self, ArtifactStore};
use crate::authorizer::{self, TokenAuthorizer};
use crate::compute::{self, ComputePrincipal, FunctionSpec};
use crate::error::StackResult;
use crate::graph::{ConstructId, StackGraph};
use crate::routing::{self, Gateway, RouteEntry, RouteTree};
use crate::tables::{self, ProvisionedTable};

/// Everything declared by one assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledStack {
    pub revision: Revision,
    pub graph: StackGraph,
    pub artifact_store: ArtifactStore,
    pub principal: ComputePrincipal,
    /// Direct-invocation URL, `open` revision only.
    pub function_url: Option<ConstructId>,
    pub authorizer: Option<TokenAuthorizer>,
    pub tables: Vec<ProvisionedTable>,
    pub routes: Option<RouteTree>,
    pub gateway: Option<Gateway>,
}

impl AssembledStack {
    pub fn table(&self, id: &str) -> Option<&ProvisionedTable> {
        self.tables.iter().find(|t| t.table_name == id)
    }

    pub fn route_entries(&self) -> Vec<RouteEntry> {
        self.routes
            .as_ref()
            .map(RouteTree::entries)
            .unwrap_or_default()
    }
}

pub struct StackAssembler<'a> {
    config: &'a StackConfig,
}

impl<'a> StackAssembler<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self) -> StackResult<AssembledStack> {
        let config = self.config;
        let revision = config.revision();
        let prefix = config.prefix();
        info!(stack = %config.stack.name, %revision, prefix, "assembling stack");

        let mut graph = StackGraph::new(&config.stack.name);
        graph.set_metadata("revision", revision.as_str());
        graph.set_metadata("prefix", prefix);
        if let Some(env) = &config.environment {
            if let Some(account) = &env.account {
                graph.set_metadata("account", account);
            }
            if let Some(region) = &env.region {
                graph.set_metadata("region", region);
            }
        }

        let declared_tables = config
            .tables
            .clone()
            .unwrap_or_else(|| tables::canonical_tables(revision));

        // 1. Artifact store.
        let artifact_store = artifact::provision(&mut graph, prefix)?;
        info!(bucket = %artifact_store.bucket_name, "artifact store declared");

        // 2. Compute principal.
        let environment = match revision {
            Revision::Open => BTreeMap::new(),
            Revision::GatewayNoAuth => {
                compute::table_environment(&declared_tables, Some(config.default_user_id()))?
            }
            Revision::GatewayWithIndexes | Revision::GatewayWithAuth => {
                compute::table_environment(&declared_tables, None)?
            }
        };
        let principal = compute::provision(
            &mut graph,
            prefix,
            &artifact_store,
            FunctionSpec {
                runtime: config.runtime(),
                artifact_key: config.artifact_key().to_string(),
                entry_point: config.entry_point().to_string(),
                environment,
            },
        )?;
        let function_url = if revision.has_gateway() {
            None
        } else {
            Some(compute::function_url(&mut graph, prefix, &principal)?)
        };
        info!(function = %principal.name, "compute principal declared");

        // 3. Authorizer.
        let authorizer = if revision.has_authorizer() {
            let auth_config = config.authorizer.clone().unwrap_or_default();
            let auth = authorizer::provision(
                &mut graph,
                prefix,
                &principal,
                auth_config
                    .identity_header
                    .as_deref()
                    .unwrap_or(authorizer::DEFAULT_IDENTITY_HEADER),
                auth_config
                    .cache_ttl_secs
                    .unwrap_or(authorizer::DEFAULT_CACHE_TTL_SECS),
            )?;
            info!(authorizer = %auth.name, "authorizer declared");
            Some(auth)
        } else {
            None
        };

        // 4. Tables and grants.
        let mut provisioned = Vec::with_capacity(declared_tables.len());
        for table in &declared_tables {
            provisioned.push(tables::provision(&mut graph, table, &principal)?);
        }
        info!(count = provisioned.len(), "tables declared");

        // 5. Routing tree.
        let extra_routes = config.routes.as_deref().unwrap_or_default();
        let (routes, gateway) = if revision.has_gateway() {
            let specs = routing::route_specs(revision, extra_routes);
            let tree = routing::compose(&specs, &principal, authorizer.as_ref())?;
            let gateway = routing::declare(&mut graph, prefix, &tree, &principal)?;
            info!(
                nodes = tree.node_count(),
                methods = tree.entries().len(),
                "routing tree declared"
            );
            (Some(tree), Some(gateway))
        } else {
            if !extra_routes.is_empty() {
                warn!(
                    count = extra_routes.len(),
                    "routes are ignored by the open revision"
                );
            }
            (None, None)
        };

        info!(constructs = graph.constructs().len(), "stack assembled");
        Ok(AssembledStack {
            revision,
            graph,
            artifact_store,
            principal,
            function_url,
            authorizer,
            tables: provisioned,
            routes,
            gateway,
        })
    }
}
