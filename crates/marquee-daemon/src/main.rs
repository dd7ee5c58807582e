//! Marquee Daemon - playbook deployment orchestrator
//!
//! One-shot commands over a loaded playbook catalog:
//! - `check`: load and cross-check playbooks and manifests
//! - `render`: print the manifests an instance would deploy
//! - `deploy` / `destroy`: run an instance operation against the cluster

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use marquee_cluster::{ClusterClient, InMemoryCluster};
use marquee_daemon::{parse_vars, App, ClusterBackend, DaemonConfig, DaemonError};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Marquee Daemon CLI
#[derive(Parser)]
#[command(name = "marqueed")]
#[command(about = "Marquee - playbook-driven instance deployment", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MARQUEE_CONFIG")]
    config: Option<String>,

    /// Namespace objects are created in
    #[arg(short, long, env = "KUBERNETES_NAMESPACE")]
    namespace: Option<String>,

    /// Chat webhook for notifications
    #[arg(long, env = "SLACK_WEBHOOK")]
    webhook_url: Option<String>,

    /// Run against an in-process cluster and print the calls made
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(long, env = "MARQUEE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "MARQUEE_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load playbooks and manifests and report what was found
    Check,
    /// Print rendered manifests for an instance
    Render(InstanceArgs),
    /// Create or update an instance and deploy it
    Deploy(InstanceArgs),
    /// Remove an instance's cluster objects
    Destroy(InstanceArgs),
}

#[derive(Args)]
struct InstanceArgs {
    /// Playbook ID
    playbook_id: String,

    /// Instance ID
    id: String,

    /// Instance variable, repeatable
    #[arg(short, long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Override with CLI args
    if let Some(namespace) = cli.namespace {
        config.deployment.namespace = namespace;
    }
    if let Some(url) = cli.webhook_url.filter(|url| !url.is_empty()) {
        config.notification.webhook_url = Some(url);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    if cli.dry_run {
        config.cluster.backend = ClusterBackend::Memory;
    }
    config.validate().context("validating configuration")?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let memory = Arc::new(InMemoryCluster::new());
    let cluster = connect(config.cluster.backend, memory.clone()).await?;
    let app = App::build(&config, cluster)?;

    match cli.command {
        Command::Check => {
            println!(
                "{} playbooks, {} manifests",
                app.playbooks().len(),
                app.manifests().len()
            );
            for playbook in app.playbooks().iter() {
                println!("  {} ({} tasks)", playbook.id, playbook.tasks.len());
            }
        }
        Command::Render(args) => {
            let vars = parse_vars(&args.vars)?;
            for rendered in app.render(&args.playbook_id, &args.id, vars)? {
                println!(
                    "# task: {} manifest: {}{}",
                    rendered.task,
                    rendered.manifest,
                    if rendered.run_pod { " (run to completion)" } else { "" }
                );
                println!("---");
                println!("{}", rendered.text.trim_end());
            }
        }
        Command::Deploy(args) => {
            let vars = parse_vars(&args.vars)?;
            let instance = app.deploy(&args.playbook_id, &args.id, vars).await?;
            println!("{} {}", instance.key(), instance.status);
        }
        Command::Destroy(args) => {
            let vars = parse_vars(&args.vars)?;
            let instance = app.destroy(&args.playbook_id, &args.id, vars).await?;
            println!("{} {}", instance.key(), instance.status);
        }
    }

    if config.cluster.backend == ClusterBackend::Memory {
        for action in memory.actions().await {
            println!("{} {}/{}", action.verb, action.kind, action.name);
        }
    }

    info!("Done");
    Ok(())
}

async fn connect(
    backend: ClusterBackend,
    memory: Arc<InMemoryCluster>,
) -> Result<Arc<dyn ClusterClient>, DaemonError> {
    match backend {
        ClusterBackend::Memory => Ok(memory),
        #[cfg(feature = "kube")]
        ClusterBackend::Kube => {
            let client = marquee_cluster::KubeClusterClient::try_default().await?;
            Ok(Arc::new(client))
        }
        #[cfg(not(feature = "kube"))]
        ClusterBackend::Kube => Err(DaemonError::Config(
            "built without the kube feature; use --dry-run or cluster.backend = memory".into(),
        )),
    }
}
