//! Configuration resolution across the ancestor chain.

use std::sync::Arc;

use guardchain::guard::resolver::{resolve_configuration, ConfigSource};
use guardchain::guard::{ExecutionContext, InvocationKind, RouteSnapshot, RouterState};
use guardchain::{ChainEvaluator, CheckId, GuardConfiguration, GuardsRelation};

use crate::support::{registry, Answer, CallLog};

fn ids(names: &[&str]) -> Vec<CheckId> {
    names.iter().map(|n| CheckId::from(*n)).collect()
}

#[test]
fn local_declaration_wins_over_attached_ancestor() {
    let child = RouteSnapshot::new("child").with_checks(["local"], None);
    let ancestors = vec![RouteSnapshot::new("parent")
        .with_checks(["inherited"], Some("OR"))
        .attach_chain(InvocationKind::ActivateChild)];

    let resolved = resolve_configuration(&child, &ancestors, InvocationKind::ActivateChild);
    assert_eq!(resolved.source, ConfigSource::Target);
    assert_eq!(resolved.config, GuardConfiguration::new(["local"], GuardsRelation::And));
}

#[test]
fn ancestor_two_levels_up_governs_when_nothing_nearer_declares() {
    let target = RouteSnapshot::new("leaf");
    let ancestors = vec![
        RouteSnapshot::new("middle"),
        RouteSnapshot::new("root").with_checks(["a", "b"], Some("Or")),
    ];

    let resolved = resolve_configuration(&target, &ancestors, InvocationKind::Activate);
    assert_eq!(
        resolved.source,
        ConfigSource::Ancestor {
            depth: 1,
            attached: false
        }
    );
    assert_eq!(resolved.config.checks, ids(&["a", "b"]));
    assert_eq!(resolved.config.relation, GuardsRelation::Or);
}

#[test]
fn nearest_declaring_ancestor_wins() {
    let target = RouteSnapshot::new("leaf");
    let ancestors = vec![
        RouteSnapshot::new("parent").with_checks(["near"], None),
        RouteSnapshot::new("root").with_checks(["far"], Some("OR")),
    ];

    let resolved = resolve_configuration(&target, &ancestors, InvocationKind::Activate);
    assert_eq!(resolved.config.checks, ids(&["near"]));
}

#[test]
fn attached_ancestor_without_checks_defers_upward() {
    let target = RouteSnapshot::new("leaf");
    let ancestors = vec![
        RouteSnapshot::new("parent").attach_chain(InvocationKind::ActivateChild),
        RouteSnapshot::new("root").with_checks(["root_check"], None),
    ];

    let resolved = resolve_configuration(&target, &ancestors, InvocationKind::ActivateChild);
    assert_eq!(resolved.config.checks, ids(&["root_check"]));
}

#[test]
fn nothing_declared_anywhere_resolves_to_empty() {
    let target = RouteSnapshot::new("leaf");
    let ancestors = vec![RouteSnapshot::new("a"), RouteSnapshot::new("b")];

    let resolved = resolve_configuration(&target, &ancestors, InvocationKind::Activate);
    assert_eq!(resolved.source, ConfigSource::Absent);
    assert!(resolved.config.is_empty());
}

#[test]
fn missing_ancestor_chain_resolves_to_empty() {
    let resolved = resolve_configuration(&RouteSnapshot::new("orphan"), &[], InvocationKind::Load);
    assert_eq!(resolved.source, ConfigSource::Absent);
    assert_eq!(resolved.config, GuardConfiguration::default());
}

#[test]
fn empty_local_list_overrides_ancestors() {
    let target = RouteSnapshot::new("public").with_checks(Vec::<&str>::new(), None);
    let ancestors = vec![RouteSnapshot::new("private").with_checks(["deny"], None)];

    let resolved = resolve_configuration(&target, &ancestors, InvocationKind::Activate);
    assert_eq!(resolved.source, ConfigSource::Target);
    assert!(resolved.config.is_empty());
}

#[tokio::test]
async fn evaluator_runs_the_inherited_configuration() {
    let log = CallLog::new();
    let eval = ChainEvaluator::new(Arc::new(registry(
        &log,
        &[("local", Answer::Reject), ("inherited", Answer::Approve)],
    )));

    let child = RouteSnapshot::new("child");
    let ancestors = vec![
        RouteSnapshot::new("section"),
        RouteSnapshot::new("app")
            .with_checks(["inherited"], None)
            .attach_chain(InvocationKind::ActivateChild),
    ];
    let ctx = ExecutionContext::activate_child(child, ancestors, RouterState::new("/app/section/child"));

    assert_eq!(eval.evaluate(&ctx).await, Ok(true));
    assert_eq!(log.entries(), vec!["inherited:activate_child"]);
}

#[tokio::test]
async fn evaluator_prefers_local_override_at_runtime() {
    let log = CallLog::new();
    let eval = ChainEvaluator::new(Arc::new(registry(
        &log,
        &[("local", Answer::Reject), ("inherited", Answer::Approve)],
    )));

    let child = RouteSnapshot::new("child").with_checks(["local"], None);
    let ancestors = vec![RouteSnapshot::new("app")
        .with_checks(["inherited"], None)
        .attach_chain(InvocationKind::ActivateChild)];
    let ctx = ExecutionContext::activate_child(child, ancestors, RouterState::new("/app/child"));

    assert_eq!(eval.evaluate(&ctx).await, Ok(false));
    assert_eq!(log.names(), vec!["local"]);
}
