//! Routing tree — path segments, verbs and access policies.
//!
//! The tree is rooted at the empty segment. Segments are either literal
//! (`settings`) or a single parameter (`{categoryId}`). Each node carries
//! zero or more verbs, every one integrated with the shared compute
//! principal and classified as public or protected.
//!
//! Registering a verb twice on the same node is rejected with
//! [`StackError::DuplicateMethod`]; sibling segments are unique by
//! construction.

use std::collections::BTreeMap;

use budget_core::config::RouteConfig;
use budget_core::{AccessPolicy, HttpMethod, ResourceDescriptor, ResourceKind, Revision};
use serde::Serialize;
use tracing::{debug, warn};

use crate::authorizer::TokenAuthorizer;
use crate::compute::ComputePrincipal;
use crate::error::{StackError, StackResult};
use crate::graph::{ConstructId, StackGraph};

/// Name of the output carrying the gateway base URL.
pub const API_ENDPOINT_OUTPUT: &str = "ApiEndpoint";

/// One verb registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBinding {
    pub verb: HttpMethod,
    pub access_policy: AccessPolicy,
    /// The principal handling the request.
    pub integration: ConstructId,
    /// Set exactly when `access_policy` is protected.
    pub authorizer: Option<ConstructId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteNode {
    pub segment: String,
    pub methods: Vec<MethodBinding>,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            methods: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_param(&self) -> bool {
        is_param(&self.segment)
    }

    /// Parameter name for `{name}` segments.
    pub fn param_name(&self) -> Option<&str> {
        self.is_param()
            .then(|| &self.segment[1..self.segment.len() - 1])
    }

    pub fn method(&self, verb: HttpMethod) -> Option<&MethodBinding> {
        self.methods.iter().find(|m| m.verb == verb)
    }

    fn child(&self, segment: &str) -> Option<&RouteNode> {
        self.children.iter().find(|c| c.segment == segment)
    }

    fn child_or_insert(&mut self, segment: &str) -> StackResult<&mut RouteNode> {
        if is_param(segment)
            && let Some(other) = self
                .children
                .iter()
                .find(|c| c.is_param() && c.segment != segment)
        {
            return Err(StackError::InvalidPath(format!(
                "{segment} conflicts with sibling parameter {}",
                other.segment
            )));
        }
        let pos = match self.children.iter().position(|c| c.segment == segment) {
            Some(pos) => pos,
            None => {
                self.children.push(RouteNode::new(segment));
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[pos])
    }
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Split `/a/{b}` into segments, validating each one.
fn parse_path(path: &str) -> StackResult<Vec<&str>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(StackError::InvalidPath(path.to_string()));
    };
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = rest.strip_suffix('/').unwrap_or(rest).split('/').collect();
    for seg in &segments {
        let valid = if is_param(seg) {
            !seg[1..seg.len() - 1].contains(['{', '}'])
        } else {
            !seg.is_empty() && !seg.contains(['{', '}'])
        };
        if !valid {
            return Err(StackError::InvalidPath(path.to_string()));
        }
    }
    Ok(segments)
}

/// A flattened `(path, verb, policy)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub path: String,
    pub verb: HttpMethod,
    pub access_policy: AccessPolicy,
}

/// A concrete request path matched against the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a> {
    /// Template path of the matched node, e.g. `/categories/{categoryId}`.
    pub template: String,
    pub binding: &'a MethodBinding,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTree {
    root: RouteNode,
}

impl RouteTree {
    pub fn new() -> Self {
        Self {
            root: RouteNode::new(""),
        }
    }

    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    /// Get or create the node at `path`, creating missing ancestors.
    pub fn resource(&mut self, path: &str) -> StackResult<&mut RouteNode> {
        let segments = parse_path(path)?;
        let mut node = &mut self.root;
        for seg in segments {
            node = node.child_or_insert(seg)?;
        }
        Ok(node)
    }

    pub fn node(&self, path: &str) -> Option<&RouteNode> {
        let segments = parse_path(path).ok()?;
        let mut node = &self.root;
        for seg in segments {
            node = node.child(seg)?;
        }
        Some(node)
    }

    /// Register `verb` on `path`. Protected verbs require `authorizer`.
    pub fn add_method(
        &mut self,
        path: &str,
        verb: HttpMethod,
        access_policy: AccessPolicy,
        integration: &ComputePrincipal,
        authorizer: Option<&TokenAuthorizer>,
    ) -> StackResult<()> {
        let authorizer = match (access_policy, authorizer) {
            (AccessPolicy::Public, _) => None,
            (AccessPolicy::Protected, Some(auth)) => Some(auth.id.clone()),
            (AccessPolicy::Protected, None) => {
                return Err(StackError::NoAuthorizer {
                    path: path.to_string(),
                    verb,
                });
            }
        };

        let node = self.resource(path)?;
        if node.method(verb).is_some() {
            return Err(StackError::DuplicateMethod {
                path: path.to_string(),
                verb,
            });
        }
        node.methods.push(MethodBinding {
            verb,
            access_policy,
            integration: integration.id.clone(),
            authorizer,
        });
        debug!(path, %verb, policy = access_policy.label(), "route registered");
        Ok(())
    }

    /// Binding for a template path such as `/categories/{categoryId}`.
    pub fn resolve(&self, path: &str, verb: HttpMethod) -> Option<&MethodBinding> {
        self.node(path)?.method(verb)
    }

    /// Match a concrete request path. Literal siblings win over parameters.
    pub fn match_request(&self, path: &str, verb: HttpMethod) -> Option<RouteMatch<'_>> {
        let rest = path.strip_prefix('/')?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let mut node = &self.root;
        let mut template = String::new();
        let mut params = BTreeMap::new();

        if !rest.is_empty() {
            for seg in rest.split('/') {
                if seg.is_empty() {
                    return None;
                }
                node = match node.children.iter().find(|c| !c.is_param() && c.segment == seg) {
                    Some(literal) => literal,
                    None => {
                        let param = node.children.iter().find(|c| c.is_param())?;
                        if let Some(name) = param.param_name() {
                            params.insert(name.to_string(), seg.to_string());
                        }
                        param
                    }
                };
                template.push('/');
                template.push_str(&node.segment);
            }
        }

        let binding = node.method(verb)?;
        if template.is_empty() {
            template.push('/');
        }
        Some(RouteMatch {
            template,
            binding,
            params,
        })
    }

    /// Depth-first enumeration: a node's verbs precede its children.
    pub fn entries(&self) -> Vec<RouteEntry> {
        let mut out = Vec::new();
        self.walk(|path, node| {
            for m in &node.methods {
                out.push(RouteEntry {
                    path: path.to_string(),
                    verb: m.verb,
                    access_policy: m.access_policy,
                });
            }
        });
        out
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _| count += 1);
        count
    }

    /// Visit every node depth-first with its template path.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&str, &'a RouteNode)) {
        fn go<'a>(path: &str, node: &'a RouteNode, visit: &mut impl FnMut(&str, &'a RouteNode)) {
            let display = if path.is_empty() { "/" } else { path };
            visit(display, node);
            for child in &node.children {
                go(&format!("{path}/{}", child.segment), child, visit);
            }
        }
        go("", &self.root, &mut visit);
    }
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

// ── Route tables ──────────────────────────────────────────────────

/// One declared route: a path with its verbs and their access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub access: AccessPolicy,
}

impl RouteSpec {
    fn new(path: &str, methods: &[HttpMethod], access: AccessPolicy) -> Self {
        Self {
            path: path.to_string(),
            methods: methods.to_vec(),
            access,
        }
    }
}

/// Policy applied to routes that don't name one.
pub fn default_access(revision: Revision) -> AccessPolicy {
    if revision.has_authorizer() {
        AccessPolicy::Protected
    } else {
        AccessPolicy::Public
    }
}

/// The canonical route table of a gateway revision. Empty for `Open`.
pub fn canonical_routes(revision: Revision) -> Vec<RouteSpec> {
    use budget_core::HttpMethod::*;

    if !revision.has_gateway() {
        return Vec::new();
    }
    let access = default_access(revision);
    let mut routes = vec![
        RouteSpec::new("/", &[Get], access),
        RouteSpec::new("/settings", &[Get, Patch], access),
        RouteSpec::new("/categories", &[Get, Post], access),
        RouteSpec::new("/categories/{categoryId}", &[Patch, Delete], access),
        RouteSpec::new("/transactions", &[Get, Post], access),
        RouteSpec::new("/transactions/{transactionId}", &[Patch, Delete], access),
    ];

    match revision {
        Revision::GatewayWithIndexes => routes.extend([
            RouteSpec::new("/reports/history-periods", &[Get], access),
            RouteSpec::new("/reports/history-data", &[Get], access),
            RouteSpec::new("/reports/balance", &[Get], access),
            RouteSpec::new("/reports/categories-overview", &[Get], access),
        ]),
        Revision::GatewayWithAuth => routes.extend([
            RouteSpec::new("/reports/history-data", &[Get], access),
            RouteSpec::new("/reports/categories-overview", &[Get], access),
            RouteSpec::new("/webhooks/clerk", &[Post], AccessPolicy::Public),
        ]),
        _ => {}
    }
    routes
}

/// Canonical routes followed by configured extras.
pub fn route_specs(revision: Revision, extra: &[RouteConfig]) -> Vec<RouteSpec> {
    let mut routes = canonical_routes(revision);
    let default = default_access(revision);
    for route in extra {
        let access = route.access.unwrap_or(default);
        if access == AccessPolicy::Protected && !revision.has_authorizer() {
            warn!(
                path = %route.path,
                revision = %revision,
                "protected route configured for a revision without an authorizer"
            );
        }
        routes.push(RouteSpec {
            path: route.path.clone(),
            methods: route.methods.clone(),
            access,
        });
    }
    routes
}

/// Build the tree for `specs`, integrating every verb with `principal`.
pub fn compose(
    specs: &[RouteSpec],
    principal: &ComputePrincipal,
    authorizer: Option<&TokenAuthorizer>,
) -> StackResult<RouteTree> {
    let mut tree = RouteTree::new();
    for spec in specs {
        tree.resource(&spec.path)?;
        for &verb in &spec.methods {
            tree.add_method(&spec.path, verb, spec.access, principal, authorizer)?;
        }
    }
    Ok(tree)
}

// ── Gateway declaration ───────────────────────────────────────────

/// Handle to the declared gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Gateway {
    pub id: ConstructId,
    pub name: String,
}

/// `categories/{categoryId}` → `CategoriesCategoryIdParam`
fn resource_suffix(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|seg| {
            let param = is_param(seg);
            let word: String = seg
                .trim_matches(|c| c == '{' || c == '}')
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(|w| {
                    let mut chars = w.chars();
                    chars
                        .next()
                        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                        .unwrap_or_default()
                })
                .collect();
            if param { format!("{word}Param") } else { word }
        })
        .collect()
}

/// `base`, or the first of `base2`, `base3`, … not yet in the graph.
///
/// Suffixes are lossy (`user-settings` and `user_settings` both give
/// `UserSettings`), so ids are checked against the graph rather than
/// trusted to be distinct.
fn unique_id(graph: &StackGraph, base: String) -> String {
    if graph.get_by_name(&base).is_none() {
        return base;
    }
    (2usize..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| graph.get_by_name(candidate).is_none())
        .unwrap_or(base)
}

/// Declare the gateway, one resource per node and one method per verb,
/// depth-first. Emits [`API_ENDPOINT_OUTPUT`].
pub fn declare(
    graph: &mut StackGraph,
    prefix: &str,
    tree: &RouteTree,
    principal: &ComputePrincipal,
) -> StackResult<Gateway> {
    let name = format!("{prefix}Api");
    let api = graph.add(
        ResourceDescriptor::new(name.clone(), ResourceKind::RestApi)
            .with_attr("rest_api_name", name.as_str())
            .depends_on(principal.id.as_str()),
    )?;

    let mut nodes: Vec<(String, &RouteNode)> = Vec::new();
    tree.walk(|path, node| nodes.push((path.to_string(), node)));

    let mut resource_ids: BTreeMap<String, ConstructId> = BTreeMap::new();
    for (path, node) in nodes {
        let resource = if path == "/" {
            api.clone()
        } else {
            let (parent_path, _) = path.rsplit_once('/').unwrap_or(("", ""));
            let parent = resource_ids
                .get(parent_path)
                .cloned()
                .unwrap_or_else(|| api.clone());
            let logical_id = unique_id(graph, format!("{name}{}", resource_suffix(&path)));
            let id = graph.add(
                ResourceDescriptor::new(logical_id, ResourceKind::ApiResource)
                .with_attr("path", path.as_str())
                .with_attr("path_part", node.segment.as_str())
                .with_attr("parent", parent.attr_ref("id"))
                .depends_on(parent.as_str()),
            )?;
            resource_ids.insert(path.clone(), id.clone());
            id
        };

        for m in &node.methods {
            let logical_id = unique_id(graph, format!("{}{}", resource.as_str(), m.verb));
            let mut method = ResourceDescriptor::new(logical_id, ResourceKind::ApiMethod)
            .with_attr("http_method", m.verb.as_str())
            .with_attr("path", path.as_str())
            .with_attr("access_policy", m.access_policy.label())
            .with_attr("integration", principal.arn())
            .with_attr("integration_type", "AWS_PROXY")
            .depends_on(resource.as_str())
            .depends_on(m.integration.as_str());
            method = match &m.authorizer {
                Some(auth) => method
                    .with_attr("authorization_type", "CUSTOM")
                    .with_attr("authorizer", auth.attr_ref("id"))
                    .depends_on(auth.as_str()),
                None => method.with_attr("authorization_type", "NONE"),
            };
            graph.add(method)?;
        }
    }

    graph.add_output(
        API_ENDPOINT_OUTPUT,
        &api,
        api.attr_ref("url"),
        "Base URL of the HTTP gateway",
    )?;
    Ok(Gateway { id: api, name })
}
