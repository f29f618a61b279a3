//! Built-in checks and their configuration form.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use guardchain::check::builtin::{
    build_unit, registry_from_definitions, BuiltinCheck, CheckDefinition, Delayed, EnvFlagCheck,
    EnvLookup, RouteDataCheck, SegmentPrefixCheck, StaticCheck,
};
use guardchain::guard::{InvocationKind, RouteSnapshot, RouterState, UrlSegment};
use guardchain::{CheckError, CheckId, CheckResolver, CheckUnit};

fn env_of(vars: &[(&str, &str)]) -> EnvLookup {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    Arc::new(move |key: &str| map.get(key).cloned())
}

fn route() -> RouteSnapshot {
    RouteSnapshot::new("page")
}

fn state() -> RouterState {
    RouterState::new("/page")
}

fn segments(parts: &[&str]) -> Vec<UrlSegment> {
    parts.iter().map(|p| UrlSegment::new(*p)).collect()
}

// ---------- static ----------

#[tokio::test]
async fn static_check_answers_every_kind() {
    let deny = StaticCheck::new(false);
    let (route, state) = (route(), state());
    assert_eq!(deny.can_activate(&route, &state).await, Ok(false));
    assert_eq!(deny.can_activate_child(&route, &state).await, Ok(false));
    assert_eq!(deny.can_load(&route, &[]).await, Ok(false));
    assert!(deny.can_activate(&route, &state).is_ready());
}

// ---------- env flag ----------

#[tokio::test]
async fn env_flag_reads_injected_environment() {
    let env = env_of(&[("BETA", "true"), ("LEGACY", "0")]);
    let (route, state) = (route(), state());

    let beta = EnvFlagCheck::new("BETA", Arc::clone(&env));
    let legacy = EnvFlagCheck::new("LEGACY", Arc::clone(&env));
    let unset = EnvFlagCheck::new("MISSING", env);

    assert_eq!(beta.can_activate(&route, &state).await, Ok(true));
    assert_eq!(legacy.can_activate(&route, &state).await, Ok(false));
    assert_eq!(unset.can_load(&route, &[]).await, Ok(false));
}

// ---------- route data ----------

#[tokio::test]
async fn route_data_check_inspects_target_data() {
    let check = RouteDataCheck::new("public");
    let state = state();

    let open = route().with_data_field("public", serde_json::json!(true));
    let closed = route().with_data_field("public", serde_json::json!(false));
    let silent = route();

    assert_eq!(check.can_activate(&open, &state).await, Ok(true));
    assert_eq!(check.can_activate_child(&closed, &state).await, Ok(false));
    assert_eq!(check.can_load(&silent, &[]).await, Ok(false));
}

// ---------- segment prefix ----------

#[tokio::test]
async fn segment_prefix_matches_leading_segments() {
    let check = SegmentPrefixCheck::new(vec!["admin".to_owned(), "tools".to_owned()]);
    let route = route();

    assert_eq!(
        check.can_load(&route, &segments(&["admin", "tools", "x"])).await,
        Ok(true)
    );
    assert_eq!(check.can_load(&route, &segments(&["admin"])).await, Ok(false));
    assert_eq!(
        check.can_load(&route, &segments(&["tools", "admin"])).await,
        Ok(false)
    );
}

#[tokio::test]
async fn segment_prefix_does_not_support_activation() {
    let check = SegmentPrefixCheck::new(Vec::new());
    assert_eq!(
        check.can_activate(&route(), &state()).await,
        Err(CheckError::Unsupported(InvocationKind::Activate))
    );
}

// ---------- delayed ----------

#[tokio::test(start_paused = true)]
async fn delayed_answers_after_the_delay() {
    let check = Delayed::new(Arc::new(StaticCheck::new(true)), Duration::from_millis(250));
    let (route, state) = (route(), state());

    let verdict = check.can_activate(&route, &state);
    assert!(!verdict.is_ready());

    let started = tokio::time::Instant::now();
    assert_eq!(verdict.await, Ok(true));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

// ---------- definitions ----------

#[test]
fn definitions_parse_from_toml() {
    let toml_str = r#"
[signed_in]
kind = "env_flag"
var = "SIGNED_IN"

[slow_admin]
kind = "route_data"
key = "admin"
delay_ms = 40

[lazy_admin]
kind = "segment_prefix"
prefix = ["admin"]
"#;
    let defs: BTreeMap<CheckId, CheckDefinition> =
        toml::from_str(toml_str).expect("definitions should parse");

    assert_eq!(
        defs.get(&CheckId::from("signed_in")),
        Some(&CheckDefinition {
            check: BuiltinCheck::EnvFlag {
                var: "SIGNED_IN".to_owned()
            },
            delay_ms: 0,
        })
    );
    assert_eq!(defs.get(&CheckId::from("slow_admin")).map(|d| d.delay_ms), Some(40));
}

#[test]
fn unknown_kind_is_rejected() {
    let parsed = toml::from_str::<BTreeMap<CheckId, CheckDefinition>>(
        r#"
[odd]
kind = "telepathy"
"#,
    );
    assert!(parsed.is_err());
}

#[tokio::test(start_paused = true)]
async fn build_unit_wraps_delayed_definitions() {
    let env = env_of(&[]);
    let def = CheckDefinition {
        check: BuiltinCheck::Static { approve: true },
        delay_ms: 10,
    };
    let unit = build_unit(&def, &env);
    let (route, state) = (route(), state());

    let verdict = unit.can_activate(&route, &state);
    assert!(!verdict.is_ready());
    assert_eq!(verdict.await, Ok(true));
}

#[tokio::test]
async fn registry_from_definitions_registers_every_id() {
    let env = env_of(&[("FLAG", "on")]);
    let mut defs = BTreeMap::new();
    defs.insert(
        CheckId::from("flag"),
        CheckDefinition {
            check: BuiltinCheck::EnvFlag {
                var: "FLAG".to_owned(),
            },
            delay_ms: 0,
        },
    );
    defs.insert(
        CheckId::from("never"),
        CheckDefinition {
            check: BuiltinCheck::Static { approve: false },
            delay_ms: 0,
        },
    );

    let registry = registry_from_definitions(&defs, &env);
    assert_eq!(registry.len(), 2);

    let (route, state) = (route(), state());
    let flag = registry.resolve(&CheckId::from("flag")).expect("registered");
    assert_eq!(flag.can_activate(&route, &state).await, Ok(true));
}
