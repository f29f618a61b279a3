//! guardchain CLI: evaluate route guard chains declared in a TOML file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use guardchain::check::builtin::{process_env, registry_from_definitions};
use guardchain::config::Config;
use guardchain::guard::InvocationKind;
use guardchain::logging::{self, LoggingGuard};
use guardchain::routes::RouteTree;
use guardchain::{ChainEvaluator, CheckRegistry};

/// Exit code for a chain that decided `false`.
const EXIT_REJECTED: u8 = 1;
/// Exit code for a chain that failed.
const EXIT_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "guardchain", version, about = "Evaluate route guard chains")]
struct Cli {
    /// Path to the config file (default: $GUARDCHAIN_CONFIG or ./guardchain.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate the guard chain governing a URL.
    Eval {
        /// Navigation URL, e.g. `/admin/users/7`.
        url: String,

        /// Invocation kind.
        #[arg(long, value_enum, default_value_t = KindArg::Activate)]
        kind: KindArg,

        /// Print the decision as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check that every referenced check identifier is defined.
    Validate,
    /// Print the route tree with declared chains.
    Routes,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Activate,
    ActivateChild,
    Load,
}

impl From<KindArg> for InvocationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Activate => Self::Activate,
            KindArg::ActivateChild => Self::ActivateChild,
            KindArg::Load => Self::Load,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Feature flags for env_flag checks may live in .env.
    let dotenv_path = dotenvy::dotenv().ok();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _log_guard = init_logging(&config)?;
    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "loaded .env");
    }

    let registry = registry_from_definitions(&config.checks, &process_env());
    let tree = RouteTree::from_definitions(&config.routes);
    info!(checks = registry.len(), "check registry ready");

    match cli.command {
        Command::Eval { url, kind, json } => eval(&tree, registry, &url, kind.into(), json).await,
        Command::Validate => Ok(validate(&tree, &registry)),
        Command::Routes => {
            for line in tree.describe() {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(config: &Config) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => logging::init_production(dir, &config.logging.level).map(Some),
        None => logging::init_cli(&config.logging.level).map(|()| None),
    }
}

async fn eval(
    tree: &RouteTree,
    registry: CheckRegistry,
    url: &str,
    kind: InvocationKind,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let matched = match tree.match_url(url) {
        Ok(matched) => matched,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_FAILED));
        }
    };
    let evaluator = ChainEvaluator::new(Arc::new(registry));
    let decision = evaluator.evaluate(&matched.context(kind)).await;

    let (label, code) = match &decision {
        Ok(true) => ("approved", ExitCode::SUCCESS),
        Ok(false) => ("rejected", ExitCode::from(EXIT_REJECTED)),
        Err(_) => ("failed", ExitCode::from(EXIT_FAILED)),
    };

    if json {
        let report = serde_json::json!({
            "url": url,
            "kind": kind,
            "route": matched.route.path,
            "decision": label,
            "error": decision.as_ref().err().map(ToString::to_string),
        });
        println!("{report}");
    } else {
        match &decision {
            Err(e) => println!("{label}: {e}"),
            Ok(_) => println!("{label}"),
        }
    }
    Ok(code)
}

fn validate(tree: &RouteTree, registry: &CheckRegistry) -> ExitCode {
    let dangling = tree.dangling_checks(registry);
    if dangling.is_empty() {
        println!("ok: all referenced checks are defined");
        return ExitCode::SUCCESS;
    }
    for entry in &dangling {
        println!("route '/{}' references undefined check '{}'", entry.route, entry.id);
    }
    ExitCode::from(EXIT_FAILED)
}
