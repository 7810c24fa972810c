use std::path::Path;

use budget_core::{Revision, StackConfig};

pub fn init(path: &str, name: &str, revision: Revision, force: bool) -> anyhow::Result<()> {
    let output = Path::new(path).join("stack.toml");
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let config = StackConfig::scaffold(name, revision);
    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
