//! `orchestry`: the admin API's command-line client, plus a handful of
//! read-only commands that talk directly to the state store.

mod client;
mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use client::ApiClient;
use error::Result;

#[derive(Parser)]
#[command(name = "orchestry", about = "Client for the Orchestry admin API", version)]
struct Cli {
    /// Base URL of a running orchestryd's admin API.
    #[arg(long, env = "ORCHESTRY_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new app from a JSON spec file.
    Register { spec: PathBuf },
    /// Start an app's replicas.
    Up { name: String },
    /// Gracefully stop an app's replicas.
    Down { name: String },
    /// Show an app's current status and instances.
    Status { name: String },
    /// Manually set an app's replica count.
    Scale { name: String, replicas: u32 },
    /// Replace an app's scaling policy from a JSON file.
    Policy { name: String, policy: PathBuf },
    /// List all registered apps.
    List,
    /// Show the raw and parsed spec an app was registered with.
    Raw { name: String },
    /// Show an app's current window aggregate, scale factors, and scaling history.
    Metrics { name: String },
    /// Feed a synthetic metric sample into an app's autoscaler, optionally evaluating it.
    Simulate { name: String, metrics: PathBuf },
    /// Global system snapshot: app/instance counts and proxy status.
    GlobalMetrics,
    /// List recent events, optionally filtered.
    Events {
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Cluster coordination commands.
    Cluster {
        #[command(subcommand)]
        command: ClusterCommand,
    },
    /// Read-only store dump commands, bypassing the admin API.
    Inspect {
        #[command(subcommand)]
        command: InspectCommand,
    },
}

#[derive(Subcommand)]
enum ClusterCommand {
    /// This node's view of cluster membership and leadership.
    Status,
    /// The current leader lease, if any.
    Leader,
    /// A terse healthy/degraded summary for load balancer probes.
    Health,
}

#[derive(Subcommand)]
enum InspectCommand {
    /// Dump every app row in the store.
    Apps,
    /// Dump every instance row for one app.
    Instances { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    orchestry_telemetry::init_tracing(orchestry_telemetry::LogFormat::Compact);

    let cli = Cli::parse();
    match run(cli).await {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value> {
    let client = ApiClient::new(cli.api_url);

    match cli.command {
        Command::Register { spec } => commands::apps::register(&client, &spec).await,
        Command::Up { name } => commands::apps::up(&client, &name).await,
        Command::Down { name } => commands::apps::down(&client, &name).await,
        Command::Status { name } => commands::apps::status(&client, &name).await,
        Command::Scale { name, replicas } => commands::apps::scale(&client, &name, replicas).await,
        Command::Policy { name, policy } => commands::apps::set_policy(&client, &name, &policy).await,
        Command::List => commands::apps::list(&client).await,
        Command::Raw { name } => commands::apps::raw(&client, &name).await,
        Command::Metrics { name } => commands::apps::metrics(&client, &name).await,
        Command::Simulate { name, metrics } => commands::apps::simulate_metrics(&client, &name, &metrics).await,
        Command::GlobalMetrics => commands::apps::global_metrics(&client).await,
        Command::Events { app, kind, limit } => {
            commands::apps::events(&client, app.as_deref(), kind.as_deref(), limit).await
        }
        Command::Cluster { command } => match command {
            ClusterCommand::Status => commands::cluster::status(&client).await,
            ClusterCommand::Leader => commands::cluster::leader(&client).await,
            ClusterCommand::Health => commands::cluster::health(&client).await,
        },
        Command::Inspect { command } => {
            let config = orchestry_config::Config::from_env().map_err(|e| error::CliError::Config(e.to_string()))?;
            let store = commands::inspect::connect(&config).await?;
            match command {
                InspectCommand::Apps => {
                    let apps = commands::inspect::apps(&store).await?;
                    Ok(serde_json::to_value(apps)?)
                }
                InspectCommand::Instances { name } => {
                    let instances = commands::inspect::instances(&store, &name).await?;
                    Ok(serde_json::to_value(instances)?)
                }
            }
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
