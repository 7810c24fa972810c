use budget_core::StackConfig;
use budget_stack::{StackAssembler, report};
use tracing::info;

pub fn synth(config: &StackConfig, format: &str) -> anyhow::Result<()> {
    let stack = StackAssembler::new(config).assemble()?;
    info!(fingerprint = %stack.graph.fingerprint()?, "stack synthesized");

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stack.graph.to_template())?);
        }
        _ => {
            println!("{}", report::format_summary(&stack));
        }
    }

    Ok(())
}
