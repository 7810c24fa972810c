//! End-to-end assembly tests.
//!
//! Assembles each revision from a scaffolded config and checks the
//! resulting tables, principal, authorizer and route table.

use budget_core::{
    AccessPolicy, HttpMethod, KeyType, LogicalTable, ResourceKind, Revision, StackConfig,
};
use budget_stack::compute::FUNCTION_URL_OUTPUT;
use budget_stack::routing::API_ENDPOINT_OUTPUT;
use budget_stack::tables::{TRANSACTION_CATEGORY_INDEX, TRANSACTION_DATE_INDEX};
use budget_stack::{AssembledStack, StackAssembler, StackError};

fn assemble(revision: Revision) -> AssembledStack {
    let config = StackConfig::scaffold("budget-tracker", revision);
    StackAssembler::new(&config).assemble().unwrap()
}

fn route_rows(stack: &AssembledStack) -> Vec<(String, HttpMethod, AccessPolicy)> {
    stack
        .route_entries()
        .into_iter()
        .map(|e| (e.path, e.verb, e.access_policy))
        .collect()
}

#[test]
fn latest_revision_resource_counts() {
    let stack = assemble(Revision::GatewayWithAuth);
    let g = &stack.graph;

    assert_eq!(stack.tables.len(), 3);
    assert_eq!(g.count_of(ResourceKind::Table), 3);
    assert_eq!(g.count_of(ResourceKind::Grant), 3);
    assert_eq!(g.count_of(ResourceKind::Function), 1);
    assert_eq!(g.count_of(ResourceKind::Authorizer), 1);
    assert_eq!(g.count_of(ResourceKind::ArtifactBucket), 1);
    assert_eq!(g.count_of(ResourceKind::FunctionUrl), 0);

    let index_total: usize = stack.tables.iter().map(|t| t.indexes.len()).sum();
    assert_eq!(index_total, 2);
    assert_eq!(stack.table("Transactions").unwrap().indexes.len(), 2);
}

#[test]
fn latest_revision_route_table() {
    use AccessPolicy::*;
    use HttpMethod::*;

    let stack = assemble(Revision::GatewayWithAuth);
    let rows = route_rows(&stack);
    let expected = vec![
        ("/".to_string(), Get, Protected),
        ("/settings".to_string(), Get, Protected),
        ("/settings".to_string(), Patch, Protected),
        ("/categories".to_string(), Get, Protected),
        ("/categories".to_string(), Post, Protected),
        ("/categories/{categoryId}".to_string(), Patch, Protected),
        ("/categories/{categoryId}".to_string(), Delete, Protected),
        ("/transactions".to_string(), Get, Protected),
        ("/transactions".to_string(), Post, Protected),
        ("/transactions/{transactionId}".to_string(), Patch, Protected),
        ("/transactions/{transactionId}".to_string(), Delete, Protected),
        ("/reports/history-data".to_string(), Get, Protected),
        ("/reports/categories-overview".to_string(), Get, Protected),
        ("/webhooks/clerk".to_string(), Post, Public),
    ];
    assert_eq!(rows, expected);

    // Root, five CRUD nodes, reports + two children, webhooks + clerk.
    assert_eq!(stack.routes.as_ref().unwrap().node_count(), 11);
    assert!(!rows.iter().any(|(p, _, _)| p == "/reports/balance"));
}

#[test]
fn webhook_is_public_while_transactions_are_protected() {
    let stack = assemble(Revision::GatewayWithAuth);
    let tree = stack.routes.as_ref().unwrap();

    let webhook = tree.resolve("/webhooks/clerk", HttpMethod::Post).unwrap();
    assert_eq!(webhook.access_policy, AccessPolicy::Public);
    assert!(webhook.authorizer.is_none());

    let create = tree.resolve("/transactions", HttpMethod::Post).unwrap();
    assert_eq!(create.access_policy, AccessPolicy::Protected);
}

#[test]
fn transaction_date_index_key_schema() {
    let stack = assemble(Revision::GatewayWithAuth);
    let transactions = stack.table("Transactions").unwrap();

    let by_date = transactions.index(TRANSACTION_DATE_INDEX).unwrap();
    assert_eq!(by_date.partition_key.name, "userId");
    assert_eq!(by_date.partition_key.key_type, KeyType::String);
    let sort = by_date.sort_key.as_ref().unwrap();
    assert_eq!(sort.name, "transactionDate");
    assert_eq!(sort.key_type, KeyType::Number);

    let by_category = transactions.index(TRANSACTION_CATEGORY_INDEX).unwrap();
    let sort = by_category.sort_key.as_ref().unwrap();
    assert_eq!(sort.name, "categoryId");
    assert_eq!(sort.key_type, KeyType::String);
}

#[test]
fn table_key_schemas_match_declarations() {
    let stack = assemble(Revision::GatewayWithAuth);
    for declared in budget_stack::tables::canonical_tables(Revision::GatewayWithAuth) {
        let table = stack.table(&declared.id).unwrap();
        assert_eq!(table.partition_key.name, declared.partition_key);
        assert_eq!(
            table.sort_key.as_ref().map(|k| k.name.as_str()),
            declared.sort_key.as_deref()
        );
        assert_eq!(table.indexes.len(), declared.secondary_indexes.len());
        for spec in &declared.secondary_indexes {
            let idx = table.index(&spec.index_name).unwrap();
            assert_eq!(idx.partition_key.name, spec.partition_key);
            assert_eq!(idx.partition_key.key_type, spec.partition_type());
        }
    }
    assert!(stack.table("Settings").unwrap().sort_key.is_none());
}

#[test]
fn single_principal_shared_everywhere() {
    let stack = assemble(Revision::GatewayWithAuth);
    let principal = &stack.principal.id;

    assert!(stack.tables.iter().all(|t| &t.grantee == principal));
    assert_eq!(&stack.authorizer.as_ref().unwrap().handler, principal);

    let tree = stack.routes.as_ref().unwrap();
    let mut bindings = 0;
    tree.walk(|_, node| {
        for m in &node.methods {
            assert_eq!(&m.integration, principal);
            bindings += 1;
        }
    });
    assert_eq!(bindings, 14);
}

#[test]
fn protected_routes_reference_the_one_authorizer() {
    let stack = assemble(Revision::GatewayWithAuth);
    let auth = &stack.authorizer.as_ref().unwrap().id;
    stack.routes.as_ref().unwrap().walk(|path, node| {
        for m in &node.methods {
            match m.access_policy {
                AccessPolicy::Protected => assert_eq!(m.authorizer.as_ref(), Some(auth), "{path}"),
                AccessPolicy::Public => assert!(m.authorizer.is_none(), "{path}"),
            }
        }
    });
}

#[test]
fn no_protected_routes_without_authorizer() {
    for revision in [Revision::GatewayNoAuth, Revision::GatewayWithIndexes] {
        let stack = assemble(revision);
        assert!(stack.authorizer.is_none());
        assert_eq!(stack.graph.count_of(ResourceKind::Authorizer), 0);
        assert!(
            stack
                .route_entries()
                .iter()
                .all(|e| e.access_policy == AccessPolicy::Public)
        );
    }
}

#[test]
fn protected_extra_route_without_authorizer_aborts() {
    let toml_str = r#"
[stack]
name = "budget-tracker"
revision = "gateway-no-auth"

[[routes]]
path = "/admin"
methods = ["GET"]
access = "protected"
"#;
    let config = StackConfig::from_toml_str(toml_str).unwrap();
    let err = StackAssembler::new(&config).assemble().unwrap_err();
    assert!(matches!(err, StackError::NoAuthorizer { .. }));
}

#[test]
fn balance_report_can_be_restored_by_config() {
    let toml_str = r#"
[stack]
name = "budget-tracker"

[[routes]]
path = "/reports/balance"
methods = ["GET"]
"#;
    let config = StackConfig::from_toml_str(toml_str).unwrap();
    let stack = StackAssembler::new(&config).assemble().unwrap();
    let balance = stack
        .routes
        .as_ref()
        .unwrap()
        .resolve("/reports/balance", HttpMethod::Get)
        .unwrap();
    assert_eq!(balance.access_policy, AccessPolicy::Protected);
}

#[test]
fn duplicate_configured_verb_is_rejected() {
    let toml_str = r#"
[stack]
name = "budget-tracker"

[[routes]]
path = "/settings"
methods = ["GET"]
"#;
    let config = StackConfig::from_toml_str(toml_str).unwrap();
    let err = StackAssembler::new(&config).assemble().unwrap_err();
    assert!(matches!(err, StackError::DuplicateMethod { verb: HttpMethod::Get, .. }));
}

#[test]
fn lookalike_route_segments_assemble() {
    let toml_str = r#"
[stack]
name = "budget-tracker"
revision = "gateway-no-auth"

[[routes]]
path = "/user-settings"
methods = ["GET"]

[[routes]]
path = "/user_settings"
methods = ["GET"]

[[routes]]
path = "/_"
methods = ["GET"]

[[routes]]
path = "/v1.0"
methods = ["GET"]

[[routes]]
path = "/v10"
methods = ["GET"]

[[routes]]
path = "/GET"
methods = ["GET"]
"#;
    let config = StackConfig::from_toml_str(toml_str).unwrap();
    let stack = StackAssembler::new(&config).assemble().unwrap();
    let tree = stack.routes.as_ref().unwrap();

    for path in ["/user-settings", "/user_settings", "/_", "/v1.0", "/v10", "/GET"] {
        assert!(tree.resolve(path, HttpMethod::Get).is_some(), "{path}");
    }
    assert_eq!(stack.graph.count_of(ResourceKind::ApiResource), tree.node_count() - 1);
    assert_eq!(stack.graph.count_of(ResourceKind::ApiMethod), tree.entries().len());
    assert_eq!(stack.graph.count_of(ResourceKind::RestApi), 1);
}

#[test]
fn tables_with_colliding_env_names_abort() {
    let toml_str = r#"
[stack]
name = "budget-tracker"
revision = "gateway-with-auth"

[[tables]]
id = "settings"
partition_key = "userId"

[[tables]]
id = "Settings"
partition_key = "userId"
"#;
    let config = StackConfig::from_toml_str(toml_str).unwrap();
    let err = StackAssembler::new(&config).assemble().unwrap_err();
    assert!(matches!(err, StackError::DuplicateEnvVar { ref var, .. } if var == "SETTINGS_TABLE"));
}

#[test]
fn hyphenated_table_id_gets_valid_env_name() {
    let mut config = StackConfig::scaffold("budget-tracker", Revision::GatewayWithAuth);
    config.tables = Some(vec![LogicalTable::new("user-settings", "userId", None)]);
    let stack = StackAssembler::new(&config).assemble().unwrap();
    assert_eq!(stack.principal.environment["USER_SETTINGS_TABLE"], "user-settings");
}

#[test]
fn open_revision_exposes_function_url() {
    let stack = assemble(Revision::Open);
    assert!(stack.routes.is_none());
    assert!(stack.gateway.is_none());
    assert!(stack.function_url.is_some());
    assert!(stack.principal.environment.is_empty());

    let output = stack.graph.output(FUNCTION_URL_OUTPUT).unwrap();
    assert_eq!(output.value, "${BudgetLambdaUrl.url}");
    assert!(stack.graph.output(API_ENDPOINT_OUTPUT).is_none());
    assert!(stack.tables.iter().all(|t| t.indexes.is_empty()));
}

#[test]
fn gateway_no_auth_environment() {
    let stack = assemble(Revision::GatewayNoAuth);
    let env = &stack.principal.environment;
    assert_eq!(env["SETTINGS_TABLE"], "Settings");
    assert_eq!(env["TRANSACTIONS_TABLE"], "Transactions");
    assert_eq!(env["CATEGORIES_TABLE"], "Categories");
    assert_eq!(env["DEFAULT_USER_ID"], "default-user");
    assert!(stack.graph.output(API_ENDPOINT_OUTPUT).is_some());
    assert!(!route_rows(&stack).iter().any(|(p, _, _)| p.starts_with("/reports")));
}

#[test]
fn gateway_with_indexes_routes() {
    let stack = assemble(Revision::GatewayWithIndexes);
    let tree = stack.routes.as_ref().unwrap();
    assert!(tree.resolve("/reports/balance", HttpMethod::Get).is_some());
    assert!(tree.resolve("/reports/history-periods", HttpMethod::Get).is_some());
    assert!(tree.node("/webhooks").is_none());
    assert_eq!(stack.table("Transactions").unwrap().indexes.len(), 2);
    assert_eq!(
        stack.table("Settings").unwrap().sort_key.as_ref().unwrap().name,
        "id"
    );
}

#[test]
fn reassembly_is_structurally_identical() {
    for revision in Revision::ALL {
        let first = assemble(revision);
        let second = assemble(revision);
        assert_eq!(first, second);
        assert_eq!(
            first.graph.fingerprint().unwrap(),
            second.graph.fingerprint().unwrap()
        );
        assert_eq!(first.graph.to_template(), second.graph.to_template());
    }
}

#[test]
fn revisions_produce_distinct_graphs() {
    let fingerprints: Vec<String> = Revision::ALL
        .into_iter()
        .map(|r| assemble(r).graph.fingerprint().unwrap())
        .collect();
    for (i, a) in fingerprints.iter().enumerate() {
        for b in &fingerprints[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn template_carries_environment_metadata() {
    let config = StackConfig::scaffold("budget-tracker", Revision::GatewayWithAuth)
        .with_environment(Some("123456789012".into()), Some("eu-central-1".into()));
    let stack = StackAssembler::new(&config).assemble().unwrap();
    let template = stack.graph.to_template();
    assert_eq!(template["metadata"]["region"], "eu-central-1");
    assert_eq!(template["metadata"]["revision"], "gateway-with-auth");
    assert_eq!(template["resources"]["BudgetLambda"]["kind"], "function");
    assert_eq!(template["declaration_order"][0], "BudgetBucket");
}
