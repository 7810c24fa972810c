//! stack.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{AccessPolicy, FunctionRuntime, HttpMethod, LogicalTable, Revision};

/// Naming prefix applied to every construct when none is configured.
pub const DEFAULT_PREFIX: &str = "Budget";

/// Identifier handed to the function as `DEFAULT_USER_ID` in the
/// `gateway-no-auth` revision.
pub const DEFAULT_USER_ID: &str = "default-user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub stack: StackSection,
    pub environment: Option<EnvironmentConfig>,
    pub function: Option<FunctionConfig>,
    pub authorizer: Option<AuthorizerConfig>,
    /// Replaces the revision's canonical table set when present.
    pub tables: Option<Vec<LogicalTable>>,
    /// Appended to the revision's canonical route table.
    pub routes: Option<Vec<RouteConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSection {
    pub name: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub revision: Revision,
}

/// Deployment target. Informational only; carried into the template metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub account: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub runtime: Option<FunctionRuntime>,
    pub artifact_key: Option<String>,
    pub entry_point: Option<String>,
    pub default_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthorizerConfig {
    /// Request header carrying the bearer token.
    pub identity_header: Option<String>,
    pub cache_ttl_secs: Option<u32>,
}

/// Extra route entry. `access` defaults to the revision's default policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub access: Option<AccessPolicy>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl StackConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: StackConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a minimal stack.toml for the given revision.
    pub fn scaffold(name: &str, revision: Revision) -> Self {
        StackConfig {
            stack: StackSection {
                name: name.to_string(),
                prefix: DEFAULT_PREFIX.to_string(),
                revision,
            },
            environment: None,
            function: Some(FunctionConfig {
                runtime: Some(FunctionRuntime::default()),
                artifact_key: Some(crate::artifact::DEFAULT_ARTIFACT_KEY.to_string()),
                entry_point: Some(crate::artifact::DEFAULT_ENTRY_POINT.to_string()),
                default_user_id: None,
            }),
            authorizer: revision.has_authorizer().then(AuthorizerConfig::default),
            tables: None,
            routes: None,
        }
    }

    pub fn revision(&self) -> Revision {
        self.stack.revision
    }

    pub fn prefix(&self) -> &str {
        &self.stack.prefix
    }

    pub fn runtime(&self) -> FunctionRuntime {
        self.function
            .as_ref()
            .and_then(|f| f.runtime.clone())
            .unwrap_or_default()
    }

    pub fn artifact_key(&self) -> &str {
        self.function
            .as_ref()
            .and_then(|f| f.artifact_key.as_deref())
            .unwrap_or(crate::artifact::DEFAULT_ARTIFACT_KEY)
    }

    pub fn entry_point(&self) -> &str {
        self.function
            .as_ref()
            .and_then(|f| f.entry_point.as_deref())
            .unwrap_or(crate::artifact::DEFAULT_ENTRY_POINT)
    }

    pub fn default_user_id(&self) -> &str {
        self.function
            .as_ref()
            .and_then(|f| f.default_user_id.as_deref())
            .unwrap_or(DEFAULT_USER_ID)
    }

    /// Fill unset account/region, e.g. from the process environment.
    pub fn with_environment(mut self, account: Option<String>, region: Option<String>) -> Self {
        let env = self.environment.get_or_insert_with(EnvironmentConfig::default);
        if env.account.is_none() {
            env.account = account;
        }
        if env.region.is_none() {
            env.region = region;
        }
        self
    }
}
