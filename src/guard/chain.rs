//! Sequential AND/OR evaluation of a guard chain.
//!
//! Checks run strictly one at a time in declared order. A check is not even
//! looked up before its predecessor has answered, so a short-circuit stops
//! all further work and side effects of checks happen in declared order.
//!
//! The evaluator owns nothing but the resolver handle; every evaluation
//! keeps its state in locals, so one instance serves concurrent navigations.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::context::{
    ExecutionContext, InvocationPayload, RouteSnapshot, RouterState, UrlSegment,
};
use super::resolver::resolve_configuration;
use super::{Decision, GuardConfiguration, GuardError, RouteGuard};
use crate::check::{CheckResolver, CheckUnit, Verdict};

/// Runs guard chains against checks from an injected resolver.
#[derive(Clone)]
pub struct ChainEvaluator {
    resolver: Arc<dyn CheckResolver>,
}

impl std::fmt::Debug for ChainEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEvaluator").finish_non_exhaustive()
    }
}

impl ChainEvaluator {
    /// Create an evaluator resolving checks through `resolver`.
    pub fn new(resolver: Arc<dyn CheckResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve the governing configuration for `ctx` and run it.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError`] when a declared check is not registered or a
    /// check errors. Remaining checks are not run in either case.
    pub async fn evaluate(&self, ctx: &ExecutionContext) -> Decision {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!(
            "guard_chain",
            %evaluation_id,
            kind = %ctx.kind(),
            target = %ctx.target.path,
        );

        async {
            let resolved = resolve_configuration(&ctx.target, &ctx.ancestors, ctx.kind());
            debug!(
                source = %resolved.source,
                checks = resolved.config.len(),
                relation = %resolved.config.relation,
                "guard configuration resolved"
            );

            let decision = self.run(&resolved.config, ctx).await;
            match &decision {
                Ok(approved) => info!(approved, "guard chain decided"),
                Err(e) => warn!(error = %e, "guard chain failed"),
            }
            decision
        }
        .instrument(span)
        .await
    }

    /// Run an already resolved configuration.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub async fn run(&self, config: &GuardConfiguration, ctx: &ExecutionContext) -> Decision {
        if config.is_empty() {
            debug!("no checks configured, approving");
            return Ok(true);
        }

        let relation = config.relation;
        for (index, id) in config.checks.iter().enumerate() {
            let unit = self
                .resolver
                .resolve(id)
                .ok_or_else(|| GuardError::UnresolvableCheck {
                    index,
                    id: id.clone(),
                })?;

            let approved = dispatch(unit.as_ref(), ctx)
                .await
                .map_err(|source| GuardError::CheckFailed {
                    index,
                    id: id.clone(),
                    source,
                })?;
            debug!(index, check = %id, approved, "check answered");

            if approved == relation.short_circuit_on() {
                debug!(index, %relation, "chain short-circuited");
                return Ok(approved);
            }
        }

        Ok(relation.exhausted())
    }
}

/// Invoke the method of `unit` that matches the invocation kind.
fn dispatch<'a>(unit: &'a dyn CheckUnit, ctx: &'a ExecutionContext) -> Verdict<'a> {
    match &ctx.payload {
        InvocationPayload::Activate { state } => unit.can_activate(&ctx.target, state),
        InvocationPayload::ActivateChild { state } => unit.can_activate_child(&ctx.target, state),
        InvocationPayload::Load { segments } => unit.can_load(&ctx.target, segments),
    }
}

#[async_trait]
impl RouteGuard for ChainEvaluator {
    async fn can_activate(
        &self,
        route: &RouteSnapshot,
        ancestors: &[RouteSnapshot],
        state: &RouterState,
    ) -> Decision {
        let ctx = ExecutionContext::activate(route.clone(), ancestors.to_vec(), state.clone());
        self.evaluate(&ctx).await
    }

    async fn can_activate_child(
        &self,
        child: &RouteSnapshot,
        ancestors: &[RouteSnapshot],
        state: &RouterState,
    ) -> Decision {
        let ctx = ExecutionContext::activate_child(child.clone(), ancestors.to_vec(), state.clone());
        self.evaluate(&ctx).await
    }

    async fn can_load(&self, route: &RouteSnapshot, segments: &[UrlSegment]) -> Decision {
        let ctx = ExecutionContext::load(route.clone(), Vec::new(), segments.to_vec());
        self.evaluate(&ctx).await
    }
}
