//! Built-in reference checks, constructible from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::registry::CheckRegistry;
use super::{CheckId, CheckUnit, Verdict};
use crate::guard::context::{RouteSnapshot, RouterState, UrlSegment};

/// Environment lookup, injected so tests never touch the process env.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment lookup backed by the real process environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Which built-in check to build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuiltinCheck {
    /// Always answers `approve`.
    Static {
        /// Fixed answer.
        approve: bool,
    },
    /// Approves when an environment flag is set.
    EnvFlag {
        /// Variable name.
        var: String,
    },
    /// Approves when the target's route data has a truthy field.
    RouteData {
        /// Field name.
        key: String,
    },
    /// Load only: approves when the URL starts with `prefix`.
    SegmentPrefix {
        /// Required leading segments.
        prefix: Vec<String>,
    },
}

/// A configured check: the built-in plus an optional artificial delay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckDefinition {
    /// The check itself.
    #[serde(flatten)]
    pub check: BuiltinCheck,
    /// Milliseconds to wait before answering (0 answers immediately).
    #[serde(default)]
    pub delay_ms: u64,
}

/// Build the unit described by `def`.
pub fn build_unit(def: &CheckDefinition, env: &EnvLookup) -> Arc<dyn CheckUnit> {
    let unit: Arc<dyn CheckUnit> = match &def.check {
        BuiltinCheck::Static { approve } => Arc::new(StaticCheck::new(*approve)),
        BuiltinCheck::EnvFlag { var } => Arc::new(EnvFlagCheck::new(var.clone(), Arc::clone(env))),
        BuiltinCheck::RouteData { key } => Arc::new(RouteDataCheck::new(key.clone())),
        BuiltinCheck::SegmentPrefix { prefix } => Arc::new(SegmentPrefixCheck::new(prefix.clone())),
    };
    if def.delay_ms == 0 {
        return unit;
    }
    Arc::new(Delayed::new(unit, Duration::from_millis(def.delay_ms)))
}

/// Build a registry holding one unit per definition.
pub fn registry_from_definitions(
    defs: &BTreeMap<CheckId, CheckDefinition>,
    env: &EnvLookup,
) -> CheckRegistry {
    defs.iter().fold(CheckRegistry::new(), |registry, (id, def)| {
        registry.with(id.clone(), build_unit(def, env))
    })
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Fixed answer for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticCheck {
    approve: bool,
}

impl StaticCheck {
    /// Create a check that always answers `approve`.
    pub fn new(approve: bool) -> Self {
        Self { approve }
    }
}

impl CheckUnit for StaticCheck {
    fn can_activate<'a>(&'a self, _route: &'a RouteSnapshot, _state: &'a RouterState) -> Verdict<'a> {
        self.approve.into()
    }

    fn can_activate_child<'a>(
        &'a self,
        _child: &'a RouteSnapshot,
        _state: &'a RouterState,
    ) -> Verdict<'a> {
        self.approve.into()
    }

    fn can_load<'a>(&'a self, _route: &'a RouteSnapshot, _segments: &'a [UrlSegment]) -> Verdict<'a> {
        self.approve.into()
    }
}

/// Feature flag read from the environment on every invocation.
pub struct EnvFlagCheck {
    var: String,
    env: EnvLookup,
}

impl std::fmt::Debug for EnvFlagCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvFlagCheck")
            .field("var", &self.var)
            .finish_non_exhaustive()
    }
}

impl EnvFlagCheck {
    /// Create a check reading `var` through `env`.
    pub fn new(var: impl Into<String>, env: EnvLookup) -> Self {
        Self {
            var: var.into(),
            env,
        }
    }

    fn enabled(&self) -> bool {
        (self.env)(&self.var).is_some_and(|value| is_truthy_flag(&value))
    }
}

/// Whether a flag value reads as enabled.
pub fn is_truthy_flag(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|truthy| value.trim().eq_ignore_ascii_case(truthy))
}

impl CheckUnit for EnvFlagCheck {
    fn can_activate<'a>(&'a self, _route: &'a RouteSnapshot, _state: &'a RouterState) -> Verdict<'a> {
        self.enabled().into()
    }

    fn can_activate_child<'a>(
        &'a self,
        _child: &'a RouteSnapshot,
        _state: &'a RouterState,
    ) -> Verdict<'a> {
        self.enabled().into()
    }

    fn can_load<'a>(&'a self, _route: &'a RouteSnapshot, _segments: &'a [UrlSegment]) -> Verdict<'a> {
        self.enabled().into()
    }
}

/// Approves when the target route's data carries a truthy field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDataCheck {
    key: String,
}

impl RouteDataCheck {
    /// Create a check for field `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn holds(&self, route: &RouteSnapshot) -> bool {
        route.data.extra.get(&self.key).is_some_and(is_truthy_value)
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
fn is_truthy_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

impl CheckUnit for RouteDataCheck {
    fn can_activate<'a>(&'a self, route: &'a RouteSnapshot, _state: &'a RouterState) -> Verdict<'a> {
        self.holds(route).into()
    }

    fn can_activate_child<'a>(
        &'a self,
        child: &'a RouteSnapshot,
        _state: &'a RouterState,
    ) -> Verdict<'a> {
        self.holds(child).into()
    }

    fn can_load<'a>(&'a self, route: &'a RouteSnapshot, _segments: &'a [UrlSegment]) -> Verdict<'a> {
        self.holds(route).into()
    }
}

/// Load-only check on the leading URL segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPrefixCheck {
    prefix: Vec<String>,
}

impl SegmentPrefixCheck {
    /// Create a check requiring `prefix`.
    pub fn new(prefix: Vec<String>) -> Self {
        Self { prefix }
    }
}

impl CheckUnit for SegmentPrefixCheck {
    fn can_load<'a>(&'a self, _route: &'a RouteSnapshot, segments: &'a [UrlSegment]) -> Verdict<'a> {
        let matches = self.prefix.len() <= segments.len()
            && self
                .prefix
                .iter()
                .zip(segments)
                .all(|(expected, segment)| *expected == segment.path);
        matches.into()
    }
}

/// Wraps a unit so its answer arrives only after `delay`.
pub struct Delayed {
    inner: Arc<dyn CheckUnit>,
    delay: Duration,
}

impl std::fmt::Debug for Delayed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delayed")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl Delayed {
    /// Delay every answer of `inner` by `delay`.
    pub fn new(inner: Arc<dyn CheckUnit>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl CheckUnit for Delayed {
    fn can_activate<'a>(&'a self, route: &'a RouteSnapshot, state: &'a RouterState) -> Verdict<'a> {
        Verdict::pending(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.can_activate(route, state).await
        })
    }

    fn can_activate_child<'a>(
        &'a self,
        child: &'a RouteSnapshot,
        state: &'a RouterState,
    ) -> Verdict<'a> {
        Verdict::pending(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.can_activate_child(child, state).await
        })
    }

    fn can_load<'a>(&'a self, route: &'a RouteSnapshot, segments: &'a [UrlSegment]) -> Verdict<'a> {
        Verdict::pending(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.can_load(route, segments).await
        })
    }
}
