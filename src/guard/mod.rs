//! Guard chains: ordered checks combined under an AND/OR relation.
//!
//! A route declares `checks` (and optionally `guardsRelation`) in its data.
//! The [`resolver`] finds the declaration that governs an invocation, and
//! the [`chain::ChainEvaluator`] runs the checks one after another until
//! the relation's short-circuit fires or the list is exhausted.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::check::{CheckError, CheckId};

pub mod chain;
pub mod context;
pub mod resolver;

pub use chain::ChainEvaluator;
pub use context::{
    ExecutionContext, InvocationKind, InvocationPayload, RouteData, RouteSnapshot, RouterState,
    UrlSegment,
};

// ---------------------------------------------------------------------------
// Relation and configuration
// ---------------------------------------------------------------------------

/// How check results combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardsRelation {
    /// Every check must approve.
    #[default]
    And,
    /// One approving check is enough.
    Or,
}

impl GuardsRelation {
    /// Interpret a declared relation. Anything but a case-insensitive `"OR"`
    /// (including no declaration at all) is AND.
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some(value) if value.eq_ignore_ascii_case("or") => Self::Or,
            _ => Self::And,
        }
    }

    /// The check result that ends the chain early.
    pub fn short_circuit_on(self) -> bool {
        match self {
            Self::And => false,
            Self::Or => true,
        }
    }

    /// Decision when no check short-circuited.
    pub fn exhausted(self) -> bool {
        !self.short_circuit_on()
    }
}

impl fmt::Display for GuardsRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// A resolved check list and its relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardConfiguration {
    /// Check identifiers in declared order; duplicates allowed.
    pub checks: Vec<CheckId>,
    /// Combination relation.
    pub relation: GuardsRelation,
}

impl GuardConfiguration {
    /// Create a configuration.
    pub fn new<I, C>(checks: I, relation: GuardsRelation) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CheckId>,
    {
        Self {
            checks: checks.into_iter().map(Into::into).collect(),
            relation,
        }
    }

    /// The configuration `data` declares, if it declares a check list.
    pub fn declared_by(data: &RouteData) -> Option<Self> {
        data.checks.as_ref().map(|checks| Self {
            checks: checks.clone(),
            relation: GuardsRelation::from_declared(data.guards_relation.as_deref()),
        })
    }

    /// Whether there is nothing to check.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }
}

// ---------------------------------------------------------------------------
// Errors and decision
// ---------------------------------------------------------------------------

/// Why a chain failed to reach a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// No check is registered under a declared identifier.
    #[error("check #{index} '{id}' is not registered")]
    UnresolvableCheck {
        /// Position in the chain.
        index: usize,
        /// Declared identifier.
        id: CheckId,
    },
    /// A check errored instead of answering.
    #[error("check #{index} '{id}' failed: {source}")]
    CheckFailed {
        /// Position in the chain.
        index: usize,
        /// Declared identifier.
        id: CheckId,
        /// The check's error.
        source: CheckError,
    },
}

impl GuardError {
    /// Identifier of the check that caused the failure.
    pub fn check_id(&self) -> &CheckId {
        match self {
            Self::UnresolvableCheck { id, .. } | Self::CheckFailed { id, .. } => id,
        }
    }
}

/// Final outcome of a chain: `Ok(approved)` or a failure.
pub type Decision = Result<bool, GuardError>;

// ---------------------------------------------------------------------------
// Framework-facing entry points
// ---------------------------------------------------------------------------

/// Guard interface the navigation framework calls, one method per kind.
#[async_trait]
pub trait RouteGuard: Send + Sync {
    /// Decide whether `route` may be activated.
    async fn can_activate(
        &self,
        route: &RouteSnapshot,
        ancestors: &[RouteSnapshot],
        state: &RouterState,
    ) -> Decision;

    /// Decide whether `child` may be activated below a guarded ancestor.
    async fn can_activate_child(
        &self,
        child: &RouteSnapshot,
        ancestors: &[RouteSnapshot],
        state: &RouterState,
    ) -> Decision;

    /// Decide whether `route` may be lazily loaded.
    async fn can_load(&self, route: &RouteSnapshot, segments: &[UrlSegment]) -> Decision;
}
