//! guardchain: ordered guard checks combined under an AND/OR relation.
//!
//! A route declares a list of check identifiers and a relation. When a
//! transition is attempted, the chain evaluator finds the declaration that
//! governs it (walking up the ancestors if needed), then runs the checks one
//! at a time until the relation short-circuits or the list runs out.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod check;
pub mod config;
pub mod guard;
pub mod logging;
pub mod routes;

pub use check::registry::CheckRegistry;
pub use check::{CheckError, CheckId, CheckResolver, CheckUnit, Verdict};
pub use guard::{ChainEvaluator, Decision, GuardConfiguration, GuardError, GuardsRelation, RouteGuard};
