//! Human-readable stack summaries.

use budget_core::ResourceKind;

use crate::assembler::AssembledStack;
use crate::routing::{RouteMatch, RouteTree};

pub fn format_summary(stack: &AssembledStack) -> String {
    let graph = &stack.graph;
    let mut out = String::new();

    out.push_str(&format!("\nStack:     {}\n", graph.name()));
    out.push_str(&format!("Revision:  {}\n", stack.revision));
    out.push_str(&format!("Bucket:    {}\n", stack.artifact_store.bucket_name));
    out.push_str(&format!(
        "Function:  {} ({}, {})\n",
        stack.principal.name,
        stack.principal.runtime.identifier(),
        stack.principal.entry_point
    ));
    match &stack.authorizer {
        Some(auth) => out.push_str(&format!("Authorizer: {} via {}\n", auth.name, auth.identity_source)),
        None => out.push_str("Authorizer: none\n"),
    }
    out.push('\n');

    out.push_str(&format!("Tables ({}):\n", stack.tables.len()));
    for t in &stack.tables {
        let sort = t
            .sort_key
            .as_ref()
            .map(|k| format!(", sort {}", k.name))
            .unwrap_or_default();
        out.push_str(&format!("  • {} (partition {}{sort})\n", t.table_name, t.partition_key.name));
        for idx in &t.indexes {
            let sort = idx
                .sort_key
                .as_ref()
                .map(|k| format!(" / {} {}", k.name, k.key_type.label()))
                .unwrap_or_default();
            out.push_str(&format!(
                "      index {}: {} {}{sort}\n",
                idx.index_name,
                idx.partition_key.name,
                idx.partition_key.key_type.label()
            ));
        }
    }

    if !stack.principal.environment.is_empty() {
        out.push_str("\nEnvironment:\n");
        for (k, v) in &stack.principal.environment {
            out.push_str(&format!("  {k}={v}\n"));
        }
    }

    if let Some(tree) = &stack.routes {
        out.push_str(&format!("\nRoutes ({} methods):\n", tree.entries().len()));
        out.push_str(&format_routes(tree));
    }

    out.push_str(&format!(
        "\nConstructs: {} ({} grants, {} api methods)\n",
        graph.constructs().len(),
        graph.count_of(ResourceKind::Grant),
        graph.count_of(ResourceKind::ApiMethod)
    ));
    for o in graph.outputs() {
        out.push_str(&format!("Output {} = {}\n", o.name, o.value));
    }
    out
}

/// One `VERB path policy` line per registered method.
pub fn format_routes(tree: &RouteTree) -> String {
    let mut out = String::new();
    for e in tree.entries() {
        out.push_str(&format!(
            "  {:<7} {:<32} {}\n",
            e.verb.as_str(),
            e.path,
            e.access_policy.label()
        ));
    }
    out
}

/// The template, verb and policy a concrete request resolved to, with its
/// captured parameters.
pub fn format_match(matched: &RouteMatch<'_>) -> String {
    let mut out = format!(
        "  {:<7} {:<32} {}\n",
        matched.binding.verb.as_str(),
        matched.template,
        matched.binding.access_policy.label()
    );
    for (name, value) in &matched.params {
        out.push_str(&format!("    {name}={value}\n"));
    }
    out
}
