//! Shared types used across budget stack crates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of provisionable resource carried by a [`ResourceDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Object storage container that stages the compute artifact.
    ArtifactBucket,
    /// The compute principal.
    Function,
    /// Direct invocation URL in front of the function.
    FunctionUrl,
    /// Keyed storage table.
    Table,
    /// Read/write permission of a principal on a table.
    Grant,
    /// Token-validating authorizer.
    Authorizer,
    /// HTTP gateway root.
    RestApi,
    /// One path segment of the gateway.
    ApiResource,
    /// One verb on a gateway resource.
    ApiMethod,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::ArtifactBucket => "artifact-bucket",
            ResourceKind::Function => "function",
            ResourceKind::FunctionUrl => "function-url",
            ResourceKind::Table => "table",
            ResourceKind::Grant => "grant",
            ResourceKind::Authorizer => "authorizer",
            ResourceKind::RestApi => "rest-api",
            ResourceKind::ApiResource => "api-resource",
            ResourceKind::ApiMethod => "api-method",
        }
    }
}

/// Immutable description of one provisionable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Stack-unique logical identifier.
    pub logical_id: String,
    pub kind: ResourceKind,
    /// Key attributes (physical names, key schemas, settings).
    pub attributes: BTreeMap<String, Value>,
    /// Logical ids that must be declared before this one.
    pub depends_on: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            attributes: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, logical_id: &str) -> Self {
        if !self.depends_on.iter().any(|d| d == logical_id) {
            self.depends_on.push(logical_id.to_string());
        }
        self
    }

    /// String attribute lookup.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Attribute type of a table or index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    #[default]
    String,
    Number,
}

impl KeyType {
    /// Single-letter attribute type code used in templates.
    pub fn code(&self) -> &'static str {
        match self {
            KeyType::String => "S",
            KeyType::Number => "N",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KeyType::String => "STRING",
            KeyType::Number => "NUMBER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    /// On-demand capacity.
    #[default]
    PayPerRequest,
}

/// What happens to a resource when the stack is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
}

/// Runtime the compute principal executes on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FunctionRuntime {
    #[default]
    #[serde(rename = "nodejs20.x")]
    Nodejs20,
    #[serde(rename = "nodejs18.x")]
    Nodejs18,
    #[serde(untagged)]
    Other(String),
}

impl FunctionRuntime {
    pub fn identifier(&self) -> &str {
        match self {
            FunctionRuntime::Nodejs20 => "nodejs20.x",
            FunctionRuntime::Nodejs18 => "nodejs18.x",
            FunctionRuntime::Other(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

/// Access classification of one route+verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// No credential check.
    Public,
    /// Token must be validated by the authorizer before the request reaches the function.
    Protected,
}

impl AccessPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            AccessPolicy::Public => "public",
            AccessPolicy::Protected => "protected",
        }
    }
}

/// Which revision of the stack to assemble.
///
/// Each tag selects the optional components: gateway vs. direct URL,
/// secondary indexes, authorizer, route set and environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Revision {
    /// Function exposed through an unauthenticated direct-invocation URL.
    Open,
    /// HTTP gateway in front of the function, every route public.
    GatewayNoAuth,
    /// Gateway plus secondary indexes on `Transactions` and the reports routes.
    GatewayWithIndexes,
    /// Gateway with a token authorizer; routes protected by default.
    #[default]
    GatewayWithAuth,
}

impl Revision {
    pub const ALL: [Revision; 4] = [
        Revision::Open,
        Revision::GatewayNoAuth,
        Revision::GatewayWithIndexes,
        Revision::GatewayWithAuth,
    ];

    pub fn latest() -> Self {
        Revision::GatewayWithAuth
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Revision::Open => "open",
            Revision::GatewayNoAuth => "gateway-no-auth",
            Revision::GatewayWithIndexes => "gateway-with-indexes",
            Revision::GatewayWithAuth => "gateway-with-auth",
        }
    }

    pub fn has_gateway(&self) -> bool {
        !matches!(self, Revision::Open)
    }

    pub fn has_authorizer(&self) -> bool {
        matches!(self, Revision::GatewayWithAuth)
    }

    pub fn has_indexes(&self) -> bool {
        matches!(self, Revision::GatewayWithIndexes | Revision::GatewayWithAuth)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Revision::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown revision: {s}. Supported: open, gateway-no-auth, gateway-with-indexes, gateway-with-auth"
                )
            })
    }
}

/// Declarative description of one keyed storage table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalTable {
    /// Stack-unique id, also the physical table name.
    pub id: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_indexes: Vec<GlobalIndexSpec>,
}

impl LogicalTable {
    pub fn new(id: &str, partition_key: &str, sort_key: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            partition_key: partition_key.to_string(),
            sort_key: sort_key.map(str::to_string),
            secondary_indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: GlobalIndexSpec) -> Self {
        self.secondary_indexes.push(index);
        self
    }
}

/// Secondary index declared on a [`LogicalTable`].
///
/// Unset key types resolve to [`KeyType::String`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalIndexSpec {
    pub index_name: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key_type: Option<KeyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key_type: Option<KeyType>,
}

impl GlobalIndexSpec {
    pub fn new(index_name: &str, partition_key: &str) -> Self {
        Self {
            index_name: index_name.to_string(),
            partition_key: partition_key.to_string(),
            partition_key_type: None,
            sort_key: None,
            sort_key_type: None,
        }
    }

    pub fn sorted_by(mut self, sort_key: &str, key_type: KeyType) -> Self {
        self.sort_key = Some(sort_key.to_string());
        self.sort_key_type = Some(key_type);
        self
    }

    pub fn partition_type(&self) -> KeyType {
        self.partition_key_type.unwrap_or_default()
    }

    pub fn sort_type(&self) -> KeyType {
        self.sort_key_type.unwrap_or_default()
    }
}
