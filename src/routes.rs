//! Static route tree used by the CLI to build execution contexts.
//!
//! Matching is depth-first: a node consumes its own path segments, then
//! children are tried in declaration order before the node itself is
//! accepted as the leaf. `:name` captures one segment, `**` swallows the
//! rest of the URL.

use std::collections::{BTreeMap, BTreeSet};

use crate::check::{CheckId, CheckResolver};
use crate::config::RouteDefinition;
use crate::guard::{
    ExecutionContext, GuardsRelation, InvocationKind, RouteData, RouteSnapshot, RouterState,
    UrlSegment,
};

/// Route lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No route matches the URL.
    #[error("no route matches '{url}'")]
    NoMatch {
        /// Requested URL.
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
    Wildcard,
}

#[derive(Debug, Clone)]
struct RouteNode {
    path: String,
    pattern: Vec<PathSegment>,
    data: RouteData,
    chain_attached: BTreeSet<InvocationKind>,
    children: Vec<RouteNode>,
}

impl RouteNode {
    fn from_definition(def: &RouteDefinition) -> Self {
        Self {
            path: def.path.clone(),
            pattern: split_path(&def.path)
                .map(|segment| match segment {
                    "**" => PathSegment::Wildcard,
                    s => match s.strip_prefix(':') {
                        Some(name) => PathSegment::Param(name.to_owned()),
                        None => PathSegment::Literal(s.to_owned()),
                    },
                })
                .collect(),
            data: RouteData {
                checks: def.checks.clone(),
                guards_relation: def.guards_relation.clone(),
                extra: def.data.clone(),
            },
            chain_attached: def.chain_on.iter().copied().collect(),
            children: def.children.iter().map(Self::from_definition).collect(),
        }
    }

    /// Consume this node's pattern from `remaining`.
    fn consume<'u>(
        &self,
        remaining: &'u [&'u str],
    ) -> Option<(BTreeMap<String, String>, &'u [&'u str])> {
        let mut params = BTreeMap::new();
        let mut rest = remaining;
        for segment in &self.pattern {
            match segment {
                PathSegment::Wildcard => rest = &[],
                PathSegment::Literal(expected) => {
                    let (first, tail) = rest.split_first()?;
                    if *first != expected.as_str() {
                        return None;
                    }
                    rest = tail;
                }
                PathSegment::Param(name) => {
                    let (first, tail) = rest.split_first()?;
                    params.insert(name.clone(), (*first).to_owned());
                    rest = tail;
                }
            }
        }
        Some((params, rest))
    }

    /// Root-to-leaf chain of nodes matching `remaining` completely.
    fn match_chain<'t>(
        &'t self,
        remaining: &[&str],
    ) -> Option<Vec<(&'t RouteNode, BTreeMap<String, String>)>> {
        let (params, rest) = self.consume(remaining)?;
        for child in &self.children {
            if let Some(mut chain) = child.match_chain(rest) {
                chain.insert(0, (self, params));
                return Some(chain);
            }
        }
        rest.is_empty().then(|| vec![(self, params)])
    }

    fn snapshot(&self, params: BTreeMap<String, String>) -> RouteSnapshot {
        RouteSnapshot {
            path: self.path.clone(),
            params,
            data: self.data.clone(),
            chain_attached: self.chain_attached.clone(),
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip query and fragment from a URL path.
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// A route tree built from configuration.
#[derive(Debug, Clone, Default)]
pub struct RouteTree {
    roots: Vec<RouteNode>,
}

/// A URL matched against the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRoute {
    /// The requested URL.
    pub url: String,
    /// Leaf node.
    pub route: RouteSnapshot,
    /// Ancestors of the leaf, immediate parent first.
    pub ancestors: Vec<RouteSnapshot>,
    /// Segments of the URL path.
    pub segments: Vec<UrlSegment>,
}

impl MatchedRoute {
    /// Build the execution context for `kind`.
    ///
    /// Load invocations see only the route itself, as a lazily loaded
    /// route has no activated parents yet.
    pub fn context(&self, kind: InvocationKind) -> ExecutionContext {
        let state = RouterState::new(self.url.clone());
        match kind {
            InvocationKind::Activate => {
                ExecutionContext::activate(self.route.clone(), self.ancestors.clone(), state)
            }
            InvocationKind::ActivateChild => {
                ExecutionContext::activate_child(self.route.clone(), self.ancestors.clone(), state)
            }
            InvocationKind::Load => {
                ExecutionContext::load(self.route.clone(), Vec::new(), self.segments.clone())
            }
        }
    }
}

/// A check reference that the resolver cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingCheck {
    /// Full path of the route declaring the reference.
    pub route: String,
    /// Unknown identifier.
    pub id: CheckId,
}

impl RouteTree {
    /// Build a tree from route definitions.
    pub fn from_definitions(defs: &[RouteDefinition]) -> Self {
        Self {
            roots: defs.iter().map(RouteNode::from_definition).collect(),
        }
    }

    /// Whether the tree has no routes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Match `url` to a leaf route.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoMatch`] if no route consumes the whole path.
    pub fn match_url(&self, url: &str) -> Result<MatchedRoute, RouteError> {
        let segments: Vec<&str> = split_path(url_path(url)).collect();
        let mut chain = self
            .roots
            .iter()
            .find_map(|root| root.match_chain(&segments))
            .ok_or_else(|| RouteError::NoMatch {
                url: url.to_owned(),
            })?;

        let (leaf, leaf_params) = chain.pop().ok_or_else(|| RouteError::NoMatch {
            url: url.to_owned(),
        })?;
        let ancestors = chain
            .into_iter()
            .rev()
            .map(|(node, params)| node.snapshot(params))
            .collect();

        Ok(MatchedRoute {
            url: url.to_owned(),
            route: leaf.snapshot(leaf_params),
            ancestors,
            segments: segments.into_iter().map(UrlSegment::new).collect(),
        })
    }

    /// Every declared check identifier that `resolver` cannot resolve.
    pub fn dangling_checks(&self, resolver: &dyn CheckResolver) -> Vec<DanglingCheck> {
        let mut dangling = Vec::new();
        self.walk(|full_path, _, node| {
            for id in node.data.checks.iter().flatten() {
                if resolver.resolve(id).is_none() {
                    dangling.push(DanglingCheck {
                        route: full_path.to_owned(),
                        id: id.clone(),
                    });
                }
            }
        });
        dangling
    }

    /// One line per node: indented full path and its declared chain.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.walk(|full_path, depth, node| {
            let mut line = format!("{}/{full_path}", "  ".repeat(depth));
            if let Some(checks) = &node.data.checks {
                let relation = GuardsRelation::from_declared(node.data.guards_relation.as_deref());
                let ids: Vec<&str> = checks.iter().map(CheckId::as_str).collect();
                line.push_str(&format!(" [{}] {relation}", ids.join(", ")));
            }
            if !node.chain_attached.is_empty() {
                let kinds: Vec<&str> = node.chain_attached.iter().map(|k| k.as_str()).collect();
                line.push_str(&format!(" chain_on={}", kinds.join(",")));
            }
            lines.push(line);
        });
        lines
    }

    /// Pre-order walk passing the full path and depth of every node.
    fn walk(&self, mut visit: impl FnMut(&str, usize, &RouteNode)) {
        let mut stack: Vec<(String, usize, &RouteNode)> = self
            .roots
            .iter()
            .rev()
            .map(|node| (node.path.clone(), 0, node))
            .collect();

        while let Some((full_path, depth, node)) = stack.pop() {
            visit(&full_path, depth, node);
            let child_depth = depth.saturating_add(1);
            for child in node.children.iter().rev() {
                let child_path = split_path(&full_path)
                    .chain(split_path(&child.path))
                    .collect::<Vec<_>>()
                    .join("/");
                stack.push((child_path, child_depth, child));
            }
        }
    }
}
