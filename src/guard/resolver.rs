//! Locates the guard configuration that governs an invocation.
//!
//! Resolution order:
//! 1. the target's own `checks` declaration, even an empty one;
//! 2. the nearest ancestor the chain is attached to for this kind, if it
//!    declares `checks`;
//! 3. the nearest ancestor declaring `checks` at all;
//! 4. otherwise the empty configuration, which approves.

use std::fmt;

use super::context::{InvocationKind, RouteSnapshot};
use super::GuardConfiguration;

/// Where a resolved configuration was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// The target node itself.
    Target,
    /// An ancestor; `depth` 0 is the immediate parent.
    Ancestor {
        /// Index into the nearest-first ancestor list.
        depth: usize,
        /// Whether the chain is attached to that ancestor for the kind.
        attached: bool,
    },
    /// Nothing declared anywhere.
    Absent,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => f.write_str("target"),
            Self::Ancestor { depth, attached } => {
                write!(f, "ancestor[{depth}]")?;
                if *attached {
                    f.write_str(" (attached)")?;
                }
                Ok(())
            }
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// A configuration together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    /// The governing configuration.
    pub config: GuardConfiguration,
    /// Its origin.
    pub source: ConfigSource,
}

/// Resolve the configuration for `kind` on `target` given its ancestors
/// (nearest first).
pub fn resolve_configuration(
    target: &RouteSnapshot,
    ancestors: &[RouteSnapshot],
    kind: InvocationKind,
) -> ResolvedConfiguration {
    if let Some(config) = GuardConfiguration::declared_by(&target.data) {
        return ResolvedConfiguration {
            config,
            source: ConfigSource::Target,
        };
    }

    let attached = nearest_declaring(ancestors, |node| node.is_chain_attached(kind));
    if let Some((depth, config)) = attached {
        return ResolvedConfiguration {
            config,
            source: ConfigSource::Ancestor {
                depth,
                attached: true,
            },
        };
    }

    match nearest_declaring(ancestors, |_| true) {
        Some((depth, config)) => ResolvedConfiguration {
            config,
            source: ConfigSource::Ancestor {
                depth,
                attached: false,
            },
        },
        None => ResolvedConfiguration {
            config: GuardConfiguration::default(),
            source: ConfigSource::Absent,
        },
    }
}

fn nearest_declaring(
    ancestors: &[RouteSnapshot],
    eligible: impl Fn(&RouteSnapshot) -> bool,
) -> Option<(usize, GuardConfiguration)> {
    ancestors
        .iter()
        .enumerate()
        .filter(|(_, node)| eligible(node))
        .find_map(|(depth, node)| GuardConfiguration::declared_by(&node.data).map(|c| (depth, c)))
}
