//! Provider gateway command line
//!
//! Loads the gateway configuration and exercises it: list providers, probe
//! their health, send a request, inspect a tenant's budget.

#![allow(missing_docs)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use provider_gateway::config::LogFormat;
use provider_gateway::core::providers::{ChatMessage, CompletionRequest, MessageRequest};
use provider_gateway::utils::logging::init_tracing;
use provider_gateway::{Gateway, GatewayConfig, GatewayRequest, TenantLimits, build_info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "gateway", version, about = "Resilient provider gateway")]
struct Cli {
    /// Configuration file; environment variables are used when it is missing
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "config/gateway.yaml")]
    config: PathBuf,

    /// Log level or filter directive (overrides the configuration)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate the configuration and exit
    Validate,
    /// List registered providers in attempt order
    Providers {
        /// Provider to put first
        #[arg(long)]
        preferred: Option<String>,
    },
    /// Probe every provider once and print breaker state
    Health,
    /// Send one request through the gateway
    Call {
        #[arg(long, default_value = "default")]
        tenant: String,
        /// Prompt for a completion request
        #[arg(long, conflicts_with_all = ["to", "body"])]
        prompt: Option<String>,
        /// Model for a completion request
        #[arg(long)]
        model: Option<String>,
        /// Recipient for a message request
        #[arg(long, requires = "body")]
        to: Option<String>,
        /// Body for a message request
        #[arg(long, requires = "to")]
        body: Option<String>,
        /// Provider to try first
        #[arg(long)]
        preferred: Option<String>,
    },
    /// Show a tenant's budget counter and usage records
    Budget {
        #[arg(long, default_value = "default")]
        tenant: String,
        /// Set the daily budget in cents
        #[arg(long)]
        daily_cents: Option<f64>,
        /// Set the monthly budget in cents
        #[arg(long)]
        monthly_cents: Option<f64>,
        /// Turn hard stop on or off
        #[arg(long)]
        hard_stop: Option<bool>,
    },
    /// Print build information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    if path.exists() {
        GatewayConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        let config = GatewayConfig::from_env().context("failed to load configuration from environment")?;
        config.validate_all()?;
        Ok(config)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        let info = build_info();
        println!(
            "gateway {} ({}, built {}, {})",
            info.version, info.git_hash, info.build_time, info.rust_version
        );
        return Ok(());
    }

    let mut config = load_config(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    init_tracing(&config.logging);
    if !cli.config.exists() {
        warn!("{} not found, configuration taken from the environment", cli.config.display());
    }

    if let Commands::Validate = cli.command {
        println!(
            "Configuration OK: {} provider(s), {} active",
            config.providers.len(),
            config.active_providers().count()
        );
        return Ok(());
    }

    let gateway = Gateway::from_config(config).await?;
    let result = execute(&gateway, cli.command).await;
    gateway.shutdown().await;
    result
}

async fn execute(gateway: &Gateway, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Providers { preferred } => {
            let registry = gateway.registry();
            let eligible = gateway.attempt_order(preferred.as_deref()).await;
            for code in registry.get_order(preferred.as_deref()) {
                let Some(provider) = registry.get(&code) else {
                    continue;
                };
                let role = if registry.primary() == Some(code.as_str()) {
                    "primary"
                } else if registry.secondary() == Some(code.as_str()) {
                    "secondary"
                } else {
                    "-"
                };
                let circuit = if eligible.contains(&code) { "eligible" } else { "open" };
                println!(
                    "{:<20} {:<18} {:<10} {}",
                    code,
                    provider.descriptor.kind().as_str(),
                    role,
                    circuit
                );
            }
        }
        Commands::Health => {
            let reports = gateway.run_health_checks().await;
            info!(providers = reports.len(), "Health sweep finished");
            let health = gateway.provider_health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Call {
            tenant,
            prompt,
            model,
            to,
            body,
            preferred,
        } => {
            let request = match (prompt, to, body) {
                (Some(prompt), None, None) => GatewayRequest::Completion(CompletionRequest {
                    model,
                    messages: vec![ChatMessage::user(prompt)],
                    max_tokens: None,
                    temperature: None,
                }),
                (None, Some(to), Some(body)) => GatewayRequest::Message(MessageRequest {
                    to,
                    body,
                    template: None,
                }),
                _ => bail!("pass either --prompt or --to with --body"),
            };

            match gateway.call(&tenant, &request, preferred.as_deref()).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(e.audit())?);
                    bail!("{} ({})", e, e.code());
                }
            }
        }
        Commands::Budget {
            tenant,
            daily_cents,
            monthly_cents,
            hard_stop,
        } => {
            let limits = TenantLimits {
                daily_budget_cents: daily_cents,
                monthly_budget_cents: monthly_cents,
                hard_stop,
                ..Default::default()
            };
            if limits != TenantLimits::default() {
                gateway.budget().configure_tenant(&tenant, &limits).await?;
            }
            let counter = gateway.budget().counter(&tenant).await?;
            println!("{}", serde_json::to_string_pretty(&counter)?);
            let records = gateway.budget().usage_records(&tenant).await?;
            println!("{} usage record(s)", records.len());
            for record in records.iter().rev().take(20) {
                println!(
                    "{} {:<12} {:<16} {:>10.4}c {:>6}ms",
                    record.created_at.to_rfc3339(),
                    record.status.as_str(),
                    record.provider.as_deref().unwrap_or("-"),
                    record.cost_cents,
                    record.latency_ms
                );
            }
        }
        Commands::Validate | Commands::Version => {}
    }
    Ok(())
}
