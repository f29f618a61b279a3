//! Check unit abstraction.
//!
//! A check is an independently authored predicate answering "may this
//! transition proceed?" for one or more [`InvocationKind`]s. Checks are
//! looked up by [`CheckId`] through a [`CheckResolver`], usually a
//! [`registry::CheckRegistry`].
//!
//! A check answers with a [`Verdict`], which is either already decided or
//! still pending. Callers `.await` both the same way.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, Either, FutureExt};
use serde::{Deserialize, Serialize};

use crate::guard::context::{InvocationKind, RouteSnapshot, RouterState, UrlSegment};

pub mod builtin;
pub mod registry;

// ---------------------------------------------------------------------------
// Identifiers and errors
// ---------------------------------------------------------------------------

/// Identifier under which a check is registered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    /// Create an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CheckId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Errors a check can produce instead of a boolean.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// The check does not implement this invocation kind.
    #[error("check does not support {0} invocations")]
    Unsupported(InvocationKind),
    /// The check ran and failed.
    #[error("check failed: {0}")]
    Failed(String),
}

/// Outcome of a single check once resolved.
pub type CheckResult = Result<bool, CheckError>;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// A check's answer, either immediate or eventual.
pub enum Verdict<'a> {
    /// Already decided.
    Ready(CheckResult),
    /// Decided once the future completes.
    Pending(BoxFuture<'a, CheckResult>),
}

impl<'a> Verdict<'a> {
    /// Immediate approval.
    pub fn approve() -> Self {
        Self::Ready(Ok(true))
    }

    /// Immediate rejection.
    pub fn reject() -> Self {
        Self::Ready(Ok(false))
    }

    /// Immediate failure.
    pub fn failed(err: CheckError) -> Self {
        Self::Ready(Err(err))
    }

    /// Immediate failure for a kind the check does not implement.
    pub fn unsupported(kind: InvocationKind) -> Self {
        Self::failed(CheckError::Unsupported(kind))
    }

    /// Wrap an eventual result.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = CheckResult> + Send + 'a,
    {
        Self::Pending(fut.boxed())
    }

    /// Whether the verdict is already decided.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl From<bool> for Verdict<'_> {
    fn from(approved: bool) -> Self {
        Self::Ready(Ok(approved))
    }
}

impl From<CheckResult> for Verdict<'_> {
    fn from(result: CheckResult) -> Self {
        Self::Ready(result)
    }
}

impl<'a> IntoFuture for Verdict<'a> {
    type Output = CheckResult;
    type IntoFuture = Either<future::Ready<CheckResult>, BoxFuture<'a, CheckResult>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(result) => Either::Left(future::ready(result)),
            Self::Pending(fut) => Either::Right(fut),
        }
    }
}

impl fmt::Debug for Verdict<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A predicate that can gate a transition.
///
/// Implement the methods for the kinds the check supports; the others
/// answer [`CheckError::Unsupported`]. Implementations must be
/// `Send + Sync` so one instance can serve concurrent navigations.
pub trait CheckUnit: Send + Sync {
    /// May `route` be activated?
    fn can_activate<'a>(&'a self, route: &'a RouteSnapshot, state: &'a RouterState) -> Verdict<'a> {
        let _ = (route, state);
        Verdict::unsupported(InvocationKind::Activate)
    }

    /// May `child` be activated underneath the route this check guards?
    fn can_activate_child<'a>(
        &'a self,
        child: &'a RouteSnapshot,
        state: &'a RouterState,
    ) -> Verdict<'a> {
        let _ = (child, state);
        Verdict::unsupported(InvocationKind::ActivateChild)
    }

    /// May `route` be lazily loaded for `segments`?
    fn can_load<'a>(&'a self, route: &'a RouteSnapshot, segments: &'a [UrlSegment]) -> Verdict<'a> {
        let _ = (route, segments);
        Verdict::unsupported(InvocationKind::Load)
    }
}

/// Maps an identifier to a check instance.
pub trait CheckResolver: Send + Sync {
    /// Look up the check registered as `id`.
    fn resolve(&self, id: &CheckId) -> Option<Arc<dyn CheckUnit>>;
}
