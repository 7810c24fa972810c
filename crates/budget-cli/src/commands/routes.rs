use budget_core::{HttpMethod, StackConfig};
use budget_stack::{RouteTree, StackAssembler, report};

/// A concrete request to resolve instead of listing the table.
pub struct RequestQuery<'a> {
    pub path: &'a str,
    pub verb: HttpMethod,
}

pub fn routes(config: &StackConfig, format: &str, query: Option<RequestQuery<'_>>) -> anyhow::Result<()> {
    let stack = StackAssembler::new(config).assemble()?;
    let Some(tree) = &stack.routes else {
        println!("Revision {} has no gateway; the function is reachable through its URL.", stack.revision);
        return Ok(());
    };

    if let Some(query) = query {
        print!("{}", describe_match(tree, &query, format)?);
        return Ok(());
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&tree.entries())?);
        }
        _ => {
            print!("{}", report::format_routes(tree));
        }
    }

    Ok(())
}

/// Render the binding a concrete request lands on.
fn describe_match(tree: &RouteTree, query: &RequestQuery<'_>, format: &str) -> anyhow::Result<String> {
    let matched = tree
        .match_request(query.path, query.verb)
        .ok_or_else(|| anyhow::anyhow!("no route for {} {}", query.verb, query.path))?;

    Ok(match format {
        "json" => {
            let value = serde_json::json!({
                "template": matched.template,
                "verb": matched.binding.verb,
                "access_policy": matched.binding.access_policy,
                "params": matched.params,
            });
            format!("{}\n", serde_json::to_string_pretty(&value)?)
        }
        _ => report::format_match(&matched),
    })
}
