//! Alfa Controllr - template-driven declarative reconciler for Kubernetes

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use kube::Client;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alfa_controllr::collect::KubeObjectSource;
use alfa_controllr::config::Config;
use alfa_controllr::fingerprint::HashTable;
use alfa_controllr::pipeline::{ManifestApplier, PrintApplier, ServerSideApplier};
use alfa_controllr::reconcile::tick;
use alfa_controllr::source::ControllerSource;
use alfa_controllr::template::TemplateEngine;

/// Alfa Controllr - renders templates whenever watched cluster objects change
#[derive(Parser, Debug)]
#[command(name = "alfa-controllr", version, about, long_about = None)]
struct Cli {
    /// Print rendered documents instead of applying them and run one tick
    #[arg(long, env = "DEBUG", default_value_t = false, action = ArgAction::Set, value_parser = parse_switch)]
    debug: bool,

    /// Expose ownerReferences=true to templates
    #[arg(long, env = "OWNERREFERENCES", default_value_t = true, action = ArgAction::Set, value_parser = parse_switch)]
    owner_references: bool,

    /// Identifier exposed to templates as managedBy
    #[arg(long, env = "MANAGEDBY")]
    managed_by: Option<String>,

    /// Controller file path; when absent, records come from the cluster API
    #[arg(long, env = "CONTROLLERS")]
    controllers: Option<PathBuf>,

    /// Seconds between ticks; zero or less runs exactly one tick
    #[arg(long, env = "INTERVAL", default_value_t = 15.0)]
    interval: f64,
}

/// Parse the truth-value vocabulary accepted by the boolean switches
///
/// Accepts `y`/`yes`/`t`/`true`/`on`/`1` and `n`/`no`/`f`/`false`/`off`/`0`,
/// case-insensitively, so `DEBUG=yes` and `OWNERREFERENCES=0` both work.
fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(format!("invalid truth value '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config {
        debug: cli.debug,
        owner_references: cli.owner_references,
        managed_by: cli.managed_by,
        controllers: cli.controllers,
        interval: cli.interval,
    };

    // Works both in-cluster and from a local kubeconfig. Only an unreachable
    // cluster API at startup is fatal; everything later is retried next tick.
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {}", e))?;
    tracing::info!("connected to the Kubernetes API");

    let source = KubeObjectSource::new(client.clone());
    let engine = TemplateEngine::new();
    let controllers = ControllerSource::from_path(config.controllers.clone());
    let applier: Box<dyn ManifestApplier> = if config.debug {
        Box::new(PrintApplier)
    } else {
        Box::new(ServerSideApplier::new(client))
    };

    // The hash table lives for the whole process and starts empty, so every
    // controller gets one unconditional apply after a restart.
    let mut table = HashTable::new();

    loop {
        match tick(
            &source,
            applier.as_ref(),
            &engine,
            &controllers,
            &mut table,
            &config,
        )
        .await
        {
            Ok(summary) => tracing::info!(
                controllers = summary.controllers,
                documents = summary.documents_applied,
                skipped = summary.skipped,
                failed = summary.failed,
                "tick complete"
            ),
            Err(e) => tracing::warn!(error = %e, "tick aborted"),
        }

        if config.run_once() {
            break;
        }
        tokio::time::sleep(config.tick_delay()).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_vocabulary_matches_the_env_surface() {
        for truthy in ["y", "yes", "t", "true", "on", "1", "YES", "True"] {
            assert_eq!(parse_switch(truthy), Ok(true), "{:?} must be true", truthy);
        }
        for falsy in ["n", "no", "f", "false", "off", "0", "NO", "Off"] {
            assert_eq!(parse_switch(falsy), Ok(false), "{:?} must be false", falsy);
        }
        assert!(parse_switch("maybe").is_err());
        assert!(parse_switch("").is_err());
    }

    #[test]
    fn cli_accepts_relaxed_boolean_values() {
        let cli = Cli::parse_from(["alfa-controllr", "--debug", "yes", "--owner-references", "0"]);
        assert!(cli.debug);
        assert!(!cli.owner_references);

        let cli = Cli::parse_from(["alfa-controllr"]);
        assert!(!cli.debug);
        assert!(cli.owner_references);

        assert!(Cli::try_parse_from(["alfa-controllr", "--debug", "maybe"]).is_err());
    }
}
