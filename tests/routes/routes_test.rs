//! Route matching and context construction.

use std::sync::Arc;

use guardchain::check::builtin::StaticCheck;
use guardchain::config::Config;
use guardchain::guard::{InvocationKind, InvocationPayload};
use guardchain::routes::{DanglingCheck, RouteError, RouteTree};
use guardchain::{CheckId, CheckRegistry};

const ROUTES: &str = r#"
[[routes]]
path = ""
checks = ["signed_in"]

[[routes.children]]
path = "admin"
checks = ["is_admin", "is_owner"]
guards_relation = "OR"
chain_on = ["activate_child"]
data = { title = "Admin" }

[[routes.children.children]]
path = "users/:id"

[[routes.children.children]]
path = "audit"
checks = []

[[routes.children]]
path = "docs/**"
"#;

fn tree() -> RouteTree {
    let config = Config::parse(ROUTES).expect("routes should parse");
    RouteTree::from_definitions(&config.routes)
}

#[test]
fn matches_nested_route_with_params() {
    let matched = tree().match_url("/admin/users/42?tab=roles").expect("should match");

    assert_eq!(matched.route.path, "users/:id");
    assert_eq!(matched.route.params.get("id").map(String::as_str), Some("42"));
    let ancestor_paths: Vec<&str> = matched.ancestors.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(ancestor_paths, vec!["admin", ""]);
    let segments: Vec<&str> = matched.segments.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(segments, vec!["admin", "users", "42"]);
}

#[test]
fn ancestor_snapshots_carry_declarations_and_attachment() {
    let matched = tree().match_url("/admin/users/1").expect("should match");
    let admin = &matched.ancestors[0];

    assert_eq!(
        admin.data.checks,
        Some(vec![CheckId::from("is_admin"), CheckId::from("is_owner")])
    );
    assert_eq!(admin.data.guards_relation.as_deref(), Some("OR"));
    assert!(admin.is_chain_attached(InvocationKind::ActivateChild));
    assert!(!admin.is_chain_attached(InvocationKind::Activate));
    assert_eq!(admin.data.extra.get("title"), Some(&serde_json::json!("Admin")));
}

#[test]
fn parent_matches_when_no_child_consumes_the_rest() {
    let matched = tree().match_url("/admin").expect("should match");
    assert_eq!(matched.route.path, "admin");
    assert_eq!(matched.ancestors.len(), 1);
}

#[test]
fn wildcard_swallows_remaining_segments() {
    let matched = tree().match_url("/docs/guide/intro").expect("should match");
    assert_eq!(matched.route.path, "docs/**");
}

#[test]
fn unmatched_url_is_an_error() {
    let err = tree().match_url("/admin/users").expect_err("id is required");
    assert_eq!(
        err,
        RouteError::NoMatch {
            url: "/admin/users".to_owned()
        }
    );
}

#[test]
fn context_carries_the_kind_specific_payload() {
    let matched = tree().match_url("/admin/audit").expect("should match");

    let activate = matched.context(InvocationKind::Activate);
    assert_eq!(activate.ancestors.len(), 2);
    assert!(matches!(
        &activate.payload,
        InvocationPayload::Activate { state } if state.url == "/admin/audit"
    ));

    let load = matched.context(InvocationKind::Load);
    assert!(load.ancestors.is_empty());
    assert!(matches!(
        &load.payload,
        InvocationPayload::Load { segments } if segments.len() == 2
    ));
}

#[test]
fn dangling_checks_lists_undefined_references() {
    let registry = CheckRegistry::new()
        .with("signed_in", Arc::new(StaticCheck::new(true)))
        .with("is_admin", Arc::new(StaticCheck::new(true)));

    let dangling = tree().dangling_checks(&registry);
    assert_eq!(
        dangling,
        vec![DanglingCheck {
            route: "admin".to_owned(),
            id: CheckId::from("is_owner"),
        }]
    );
}

#[test]
fn describe_lists_every_node_in_order() {
    let lines = tree().describe();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "/ [signed_in] AND");
    assert_eq!(
        lines[1],
        "  /admin [is_admin, is_owner] OR chain_on=activate_child"
    );
    assert_eq!(lines[2], "    /admin/users/:id");
    assert_eq!(lines[3], "    /admin/audit [] AND");
    assert_eq!(lines[4], "  /docs/**");
}
