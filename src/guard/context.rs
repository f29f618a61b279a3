//! Invocation context handed to a guard chain by the navigation layer.
//!
//! Everything here is an immutable snapshot built fresh for one invocation.
//! The chain reads it, never writes it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::check::CheckId;

// ---------------------------------------------------------------------------
// Invocation kind
// ---------------------------------------------------------------------------

/// Which capability of the chain is being exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// Entering a route.
    Activate,
    /// Entering a child of the route the guard is attached to.
    ActivateChild,
    /// Lazily loading a route's module.
    Load,
}

impl InvocationKind {
    /// Stable lowercase name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::ActivateChild => "activate_child",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Route snapshot
// ---------------------------------------------------------------------------

/// Declared data of a route node.
///
/// `checks` and `guardsRelation` drive the chain; any other field is kept
/// in `extra` for checks that inspect route data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    /// Ordered check identifiers, if this node declares a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<CheckId>>,
    /// Declared combination relation (`"AND"` / `"OR"`), if any.
    #[serde(
        default,
        rename = "guardsRelation",
        alias = "guards_relation",
        skip_serializing_if = "Option::is_none"
    )]
    pub guards_relation: Option<String>,
    /// Remaining free-form fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Snapshot of one node in the route tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSnapshot {
    /// The node's own path pattern (e.g. `users/:id`).
    pub path: String,
    /// Parameters captured by this node's path pattern.
    pub params: BTreeMap<String, String>,
    /// Declared route data.
    pub data: RouteData,
    /// Kinds for which the chain evaluator is registered on this node.
    pub chain_attached: BTreeSet<InvocationKind>,
}

impl RouteSnapshot {
    /// Create a snapshot with the given path and no data.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Declare a check chain on this node.
    #[must_use]
    pub fn with_checks<I, C>(mut self, checks: I, relation: Option<&str>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CheckId>,
    {
        self.data.checks = Some(checks.into_iter().map(Into::into).collect());
        self.data.guards_relation = relation.map(str::to_owned);
        self
    }

    /// Set a free-form data field.
    #[must_use]
    pub fn with_data_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.extra.insert(key.into(), value);
        self
    }

    /// Set a captured path parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Mark the chain evaluator as registered on this node for `kind`.
    #[must_use]
    pub fn attach_chain(mut self, kind: InvocationKind) -> Self {
        self.chain_attached.insert(kind);
        self
    }

    /// Whether the chain evaluator is registered on this node for `kind`.
    pub fn is_chain_attached(&self, kind: InvocationKind) -> bool {
        self.chain_attached.contains(&kind)
    }

    /// Whether this node declares its own check list (possibly empty).
    pub fn declares_checks(&self) -> bool {
        self.data.checks.is_some()
    }
}

/// The navigation being attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    /// Target URL of the navigation.
    pub url: String,
}

impl RouterState {
    /// Create a router state for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One path segment of a navigation, as seen by load checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UrlSegment {
    /// Raw segment text.
    pub path: String,
}

impl UrlSegment {
    /// Create a segment.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Display for UrlSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Kind-specific payload of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationPayload {
    /// Route activation.
    Activate {
        /// Navigation being attempted.
        state: RouterState,
    },
    /// Child route activation.
    ActivateChild {
        /// Navigation being attempted.
        state: RouterState,
    },
    /// Lazy load.
    Load {
        /// Segments of the navigation URL.
        segments: Vec<UrlSegment>,
    },
}

impl InvocationPayload {
    /// The invocation kind this payload belongs to.
    pub fn kind(&self) -> InvocationKind {
        match self {
            Self::Activate { .. } => InvocationKind::Activate,
            Self::ActivateChild { .. } => InvocationKind::ActivateChild,
            Self::Load { .. } => InvocationKind::Load,
        }
    }
}

/// Everything one chain evaluation sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    /// Node being gated.
    pub target: RouteSnapshot,
    /// Ancestors of `target`, immediate parent first, root last.
    pub ancestors: Vec<RouteSnapshot>,
    /// Kind-specific payload.
    pub payload: InvocationPayload,
}

impl ExecutionContext {
    /// Context for activating `target`.
    pub fn activate(target: RouteSnapshot, ancestors: Vec<RouteSnapshot>, state: RouterState) -> Self {
        Self {
            target,
            ancestors,
            payload: InvocationPayload::Activate { state },
        }
    }

    /// Context for activating `child` underneath a guarded ancestor.
    pub fn activate_child(
        child: RouteSnapshot,
        ancestors: Vec<RouteSnapshot>,
        state: RouterState,
    ) -> Self {
        Self {
            target: child,
            ancestors,
            payload: InvocationPayload::ActivateChild { state },
        }
    }

    /// Context for lazily loading `target`.
    pub fn load(target: RouteSnapshot, ancestors: Vec<RouteSnapshot>, segments: Vec<UrlSegment>) -> Self {
        Self {
            target,
            ancestors,
            payload: InvocationPayload::Load { segments },
        }
    }

    /// The invocation kind.
    pub fn kind(&self) -> InvocationKind {
        self.payload.kind()
    }
}
