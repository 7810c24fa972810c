pub mod init;
pub mod routes;
pub mod synth;

use std::path::Path;

use budget_core::{Revision, StackConfig};

/// Load `stack.toml`, applying CLI overrides.
pub fn load_config(
    path: &str,
    revision: Option<Revision>,
    account: Option<String>,
    region: Option<String>,
) -> anyhow::Result<StackConfig> {
    let mut config = StackConfig::from_file(Path::new(path))
        .map_err(|e| anyhow::anyhow!("failed to load {path}: {e}"))?;
    if let Some(revision) = revision {
        config.stack.revision = revision;
    }
    Ok(config.with_environment(account, region))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_revision_and_fills_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.toml");
        std::fs::write(&path, "[stack]\nname = \"t\"\nrevision = \"open\"\n").unwrap();

        let config = load_config(
            path.to_str().unwrap(),
            Some(Revision::GatewayWithIndexes),
            None,
            Some("us-west-2".into()),
        )
        .unwrap();
        assert_eq!(config.revision(), Revision::GatewayWithIndexes);
        assert_eq!(config.environment.unwrap().region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn missing_config_names_the_path() {
        let err = load_config("/nonexistent/stack.toml", None, None, None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stack.toml"));
    }
}
