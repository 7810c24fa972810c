//! Table provisioning and read/write grants.
//!
//! Each [`LogicalTable`] becomes one on-demand table with string primary
//! keys, torn down with the stack. Secondary indexes carry their own key
//! schema. Once the table is declared the shared principal is granted
//! read/write access to the table and its indexes.

use std::collections::HashSet;

use budget_core::{
    BillingMode, GlobalIndexSpec, KeyType, LogicalTable, RemovalPolicy, ResourceDescriptor,
    ResourceKind, Revision,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::compute::ComputePrincipal;
use crate::error::{StackError, StackResult};
use crate::graph::{ConstructId, StackGraph};

/// Actions covered by a read/write data grant.
pub const READ_WRITE_ACTIONS: [&str; 10] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetItem",
    "dynamodb:Query",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySchema {
    pub name: String,
    pub key_type: KeyType,
}

impl KeySchema {
    fn new(name: &str, key_type: KeyType) -> Self {
        Self {
            name: name.to_string(),
            key_type,
        }
    }

    fn to_value(&self) -> Value {
        json!({ "name": self.name, "type": self.key_type.code() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedIndex {
    pub index_name: String,
    pub partition_key: KeySchema,
    pub sort_key: Option<KeySchema>,
}

/// Result of provisioning one [`LogicalTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedTable {
    pub id: ConstructId,
    pub table_name: String,
    pub partition_key: KeySchema,
    pub sort_key: Option<KeySchema>,
    pub billing_mode: BillingMode,
    pub removal_policy: RemovalPolicy,
    pub indexes: Vec<ProvisionedIndex>,
    /// The read/write grant held by the principal.
    pub grant: ConstructId,
    pub grantee: ConstructId,
}

impl ProvisionedTable {
    pub fn index(&self, name: &str) -> Option<&ProvisionedIndex> {
        self.indexes.iter().find(|i| i.index_name == name)
    }
}

fn resolve_index(table: &LogicalTable, spec: &GlobalIndexSpec) -> StackResult<ProvisionedIndex> {
    if spec.partition_key.is_empty() {
        return Err(StackError::EmptyPartitionKey(format!(
            "{}/{}",
            table.id, spec.index_name
        )));
    }
    Ok(ProvisionedIndex {
        index_name: spec.index_name.clone(),
        partition_key: KeySchema::new(&spec.partition_key, spec.partition_type()),
        sort_key: spec
            .sort_key
            .as_deref()
            .map(|name| KeySchema::new(name, spec.sort_type())),
    })
}

/// Declare `table`, its indexes, and a read/write grant for `principal`.
pub fn provision(
    graph: &mut StackGraph,
    table: &LogicalTable,
    principal: &ComputePrincipal,
) -> StackResult<ProvisionedTable> {
    if table.partition_key.is_empty() {
        return Err(StackError::EmptyPartitionKey(table.id.clone()));
    }

    let mut seen = HashSet::new();
    let mut indexes = Vec::with_capacity(table.secondary_indexes.len());
    for spec in &table.secondary_indexes {
        if !seen.insert(spec.index_name.as_str()) {
            return Err(StackError::DuplicateIndex {
                table: table.id.clone(),
                index: spec.index_name.clone(),
            });
        }
        indexes.push(resolve_index(table, spec)?);
    }

    let partition_key = KeySchema::new(&table.partition_key, KeyType::String);
    let sort_key = table
        .sort_key
        .as_deref()
        .map(|name| KeySchema::new(name, KeyType::String));

    let index_values: Vec<Value> = indexes
        .iter()
        .map(|i| {
            json!({
                "index_name": i.index_name,
                "partition_key": i.partition_key.to_value(),
                "sort_key": i.sort_key.as_ref().map(KeySchema::to_value),
            })
        })
        .collect();

    let mut descriptor = ResourceDescriptor::new(table.id.clone(), ResourceKind::Table)
        .with_attr("table_name", table.id.as_str())
        .with_attr("partition_key", partition_key.to_value())
        .with_attr("billing_mode", json!(BillingMode::PayPerRequest))
        .with_attr("removal_policy", json!(RemovalPolicy::Destroy))
        .with_attr("global_secondary_indexes", index_values);
    if let Some(sk) = &sort_key {
        descriptor = descriptor.with_attr("sort_key", sk.to_value());
    }
    let id = graph.add(descriptor)?;

    let table_arn = id.attr_ref("arn");
    let mut resources = vec![Value::from(table_arn.clone())];
    if !indexes.is_empty() {
        resources.push(Value::from(format!("{table_arn}/index/*")));
    }
    let grant = ResourceDescriptor::new(format!("{}ReadWriteGrant", table.id), ResourceKind::Grant)
        .with_attr("grantee", principal.arn())
        .with_attr("actions", json!(READ_WRITE_ACTIONS))
        .with_attr("resources", resources)
        .depends_on(id.as_str())
        .depends_on(principal.id.as_str());
    let grant = graph.add(grant)?;

    debug!(
        table = %table.id,
        indexes = indexes.len(),
        grantee = %principal.name,
        "table provisioned"
    );

    Ok(ProvisionedTable {
        id,
        table_name: table.id.clone(),
        partition_key,
        sort_key,
        billing_mode: BillingMode::PayPerRequest,
        removal_policy: RemovalPolicy::Destroy,
        indexes,
        grant,
        grantee: principal.id.clone(),
    })
}

/// Index over a user's transactions ordered by date.
pub const TRANSACTION_DATE_INDEX: &str = "userId-transactionDate";

/// Index over a user's transactions within a category.
pub const TRANSACTION_CATEGORY_INDEX: &str = "userId-categoryId";

/// The canonical `Transactions`, `Categories` and `Settings` tables for a revision.
pub fn canonical_tables(revision: Revision) -> Vec<LogicalTable> {
    let mut transactions = LogicalTable::new("Transactions", "userId", Some("id"));
    if revision.has_indexes() {
        transactions = transactions
            .with_index(
                GlobalIndexSpec::new(TRANSACTION_DATE_INDEX, "userId")
                    .sorted_by("transactionDate", KeyType::Number),
            )
            .with_index(
                GlobalIndexSpec::new(TRANSACTION_CATEGORY_INDEX, "userId")
                    .sorted_by("categoryId", KeyType::String),
            );
    }
    let settings_sort = match revision {
        Revision::GatewayWithAuth => None,
        _ => Some("id"),
    };

    vec![
        transactions,
        LogicalTable::new("Categories", "userId", Some("id")),
        LogicalTable::new("Settings", "userId", settings_sort),
    ]
}
