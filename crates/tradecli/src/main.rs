use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tradecore::{ConfigProvider, ExecutionEvent};
use tradeengine::{AdapterRegistry, Engine};

#[derive(Parser)]
#[command(name = "trade")]
#[command(about = "Trade flow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow by id
    Run {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Id of the flow to execute
        flow_id: String,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate flows without executing them
    Validate {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Id of the flow to validate; validates every flow when omitted
        flow_id: Option<String>,
    },

    /// List configured flows
    Flows {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// List available adapters
    Adapters,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            flow_id,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_flow(config, &flow_id).await?;
        }

        Commands::Validate { config, flow_id } => {
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::WARN)
                .init();

            validate_flows(config, flow_id).await?;
        }

        Commands::Flows { config } => {
            list_flows(config)?;
        }

        Commands::Adapters => {
            list_adapters();
        }
    }

    Ok(())
}

async fn boot_engine(config_path: PathBuf) -> Result<Engine> {
    let config = Arc::new(ConfigProvider::from_path(&config_path)?);

    let mut registry = AdapterRegistry::new();
    tradeadapters::register_all(&mut registry, Arc::clone(&config));

    let mut engine = Engine::new(config, registry);
    engine.init().await?;
    Ok(engine)
}

async fn run_flow(config_path: PathBuf, flow_id: &str) -> Result<()> {
    println!("🚀 Loading config from: {}", config_path.display());

    let engine = boot_engine(config_path).await?;
    println!("✅ Engine initialized");
    println!();

    // Print step progress while the flow runs.
    let mut events = engine.event_bus().subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::FlowStarted { flow_id, .. } => {
                    println!("▶️  Flow {} started", flow_id);
                }
                ExecutionEvent::StepStarted {
                    step_index,
                    step_type,
                    adapter,
                    ..
                } => {
                    println!("  ⚡ Step {}: {} ({})", step_index, step_type, adapter);
                }
                ExecutionEvent::StepCompleted {
                    step_index,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Step {} completed in {}ms", step_index, duration_ms);
                }
                ExecutionEvent::StepFailed {
                    step_index, error, ..
                } => {
                    println!("  ❌ Step {} failed: {}", step_index, error);
                }
                ExecutionEvent::FlowCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Flow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Flow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let result = engine.execute(flow_id).await;

    // Let the listener drain before printing the summary.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let result = result?;

    println!();
    println!("📊 Result:");
    println!("   Success: {}", result.success);
    println!("   Data: {}", serde_json::to_string_pretty(&result.data)?);

    Ok(())
}

async fn validate_flows(config_path: PathBuf, flow_id: Option<String>) -> Result<()> {
    println!("🔍 Validating against: {}", config_path.display());

    let config = Arc::new(ConfigProvider::from_path(&config_path)?);
    let flow_ids: Vec<String> = match flow_id {
        Some(id) => vec![id],
        None => config.flows().iter().map(|f| f.id.clone()).collect(),
    };

    let mut registry = AdapterRegistry::new();
    tradeadapters::register_all(&mut registry, Arc::clone(&config));
    let mut engine = Engine::new(config, registry);
    engine.init().await?;

    let mut failures = 0;
    for id in &flow_ids {
        match engine.validate(id).await {
            Ok(()) => println!("  ✅ {}", id),
            Err(err) => {
                failures += 1;
                println!("  ❌ {}: {}", id, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} flows failed validation", flow_ids.len());
    }
    println!("✨ All flows valid");
    Ok(())
}

fn list_flows(config_path: PathBuf) -> Result<()> {
    let config = ConfigProvider::from_path(&config_path)?;

    println!("📋 Configured flows:");
    for flow in config.flows() {
        println!("  • {}: {} ({} steps)", flow.id, flow.name, flow.steps.len());
        if !flow.description.is_empty() {
            println!("    {}", flow.description);
        }
    }
    Ok(())
}

fn list_adapters() {
    println!("📦 Available adapters:");
    println!("  • ccxt (centralized-exchange trading and withdrawals)");
    println!("  • squid (cross-chain bridge swaps)");
    println!("  • mento (on-chain DEX swaps)");
}
