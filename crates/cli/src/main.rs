//! Shadow CLI - run synthetic strategies through the shadow engine.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use shadow_manager::{
    ApprovalGate, Metrics, RiskLevel, ShadowConfig, ShadowManager, ShadowReview, ShadowTask,
    Strategy, StrategyId, TaskContext, TaskId, UpgradeOutcome,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shadow")]
#[command(about = "Concurrent strategy execution and evolution engine", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run synthetic strategies side by side and let the engine evolve
    Simulate {
        /// Strategy as name:failure_rate:latency_ms:cost (repeatable)
        #[arg(long = "strategy")]
        strategies: Vec<SimStrategy>,
        /// Number of shadow batches to run
        #[arg(long, default_value = "30")]
        batches: u64,
        /// Approve the upgrade proposal, if any
        #[arg(long)]
        approve: bool,
    },
    /// Print the effective configuration
    Config,
}

/// A synthetic strategy profile.
#[derive(Debug, Clone)]
struct SimStrategy {
    name: String,
    failure_rate: f64,
    latency_ms: u64,
    cost: f64,
}

impl FromStr for SimStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split(':').collect();
        let [name, failure_rate, latency_ms, cost] = parts.as_slice() else {
            return Err(format!("expected name:failure_rate:latency_ms:cost, got '{}'", s));
        };
        Ok(Self {
            name: name.to_string(),
            failure_rate: failure_rate.parse().map_err(|_| format!("bad failure rate '{}'", failure_rate))?,
            latency_ms: latency_ms.parse().map_err(|_| format!("bad latency '{}'", latency_ms))?,
            cost: cost.parse().map_err(|_| format!("bad cost '{}'", cost))?,
        })
    }
}

fn default_strategies() -> Vec<SimStrategy> {
    ["baseline:0.05:300:0.10", "compact:0.08:120:0.04", "experimental:0.45:80:0.02"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Deterministic pseudo-random failure schedule.
fn fails(batch: u64, index: u64, rate: f64) -> bool {
    let bucket = (batch.wrapping_mul(2_654_435_761) ^ index.wrapping_mul(40_503)) % 100;
    (bucket as f64) < rate * 100.0
}

fn simulated_task() -> Arc<dyn ShadowTask> {
    Arc::new(|ctx: TaskContext| async move {
        let config = &ctx.strategy.config;
        let index = config.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
        let failure_rate = config.get("failure_rate").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let latency_ms = config.get("latency_ms").and_then(|v| v.as_u64()).unwrap_or(0);
        let cost = config.get("cost").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let batch = ctx.input["batch"].as_u64().unwrap_or(0);

        if fails(batch, index, failure_rate) {
            bail!("{} failed on batch {}", ctx.strategy.id, batch);
        }

        Ok(Metrics::new(format!("Summary of batch {} produced by {}", batch, ctx.strategy.name))
            .with_latency(Duration::from_millis(latency_ms.max(1)))
            .with_cost(cost)
            .with_tokens((cost * 10_000.0) as u64)
            .with_quality(1.0 - failure_rate)
            .count("sub_calls", 1))
    })
}

/// Answers permission requests from the command line flag.
struct FlagGate {
    approve: bool,
}

#[async_trait]
impl ApprovalGate for FlagGate {
    async fn ask_permission(&self, risk: RiskLevel, prompt: &str) -> bool {
        println!("[{} risk] {}", risk, prompt);
        println!("-> {}", if self.approve { "approved" } else { "rejected" });
        self.approve
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ShadowConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ShadowConfig::default(),
    };

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Simulate { strategies, batches, approve } => {
            let strategies = if strategies.is_empty() { default_strategies() } else { strategies };
            simulate(config, strategies, batches, approve).await?;
        }
    }

    Ok(())
}

async fn simulate(config: ShadowConfig, profiles: Vec<SimStrategy>, batches: u64, approve: bool) -> Result<()> {
    let manager = ShadowManager::new(config);
    info!(
        interval_ms = manager.config().evolution_interval().as_millis() as u64,
        batches,
        "Starting simulation"
    );

    for (index, profile) in profiles.iter().enumerate() {
        let strategy = Strategy::new(profile.name.as_str(), profile.name.as_str(), "sim")
            .with_config("index", index as u64)
            .with_config("failure_rate", profile.failure_rate)
            .with_config("latency_ms", profile.latency_ms)
            .with_config("cost", profile.cost);
        manager.register_strategy(strategy).await?;
    }
    let Some(primary) = manager.strategies().await.first().map(|s| s.id.clone()) else {
        bail!("no strategies to simulate");
    };

    manager.start().await?;
    let task = simulated_task();
    let mut dispatched = 0u64;

    for batch in 0..batches {
        let executions = manager
            .execute_shadow(TaskId::new(), Some(&primary), serde_json::json!({ "batch": batch }), task.clone())
            .await?;
        dispatched += executions.len() as u64;
    }

    // Let the pipeline catch up before judging.
    for _ in 0..200 {
        if manager.metrics().await.executions_evaluated >= dispatched {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let events = manager.evolve_now().await;
    info!(dispatched, changes = events.len(), "Simulation finished");

    let metrics = manager.metrics().await;
    println!("Strategies ({})", metrics.strategies_total);
    for s in &metrics.strategies {
        println!(
            "  {:<14} | {:<8} | runs {:>4} | success {:>5.1}% | latency {:>7.1}ms | score {:>6.3}",
            s.id.as_str(),
            if s.enabled { "ENABLED" } else { "DISABLED" },
            s.executions,
            s.success_rate * 100.0,
            s.mean_latency_ms,
            s.score,
        );
    }

    let best = manager.best_strategy().await;
    match &best {
        Some(best) => println!("Best strategy: {} ({:.3})", best.id, best.score()),
        None => println!("Best strategy: none qualifies yet"),
    }

    println!("Evolution history ({})", metrics.evolution_events);
    for event in manager.evolution_history().await {
        println!(
            "  {} | {} | {} | impact {:.2} | {}",
            event.timestamp.to_rfc3339(),
            event.strategy_id,
            event.kind,
            event.impact,
            event.reason,
        );
    }

    if let Some(best) = best.filter(|b| b.id != primary) {
        let recent = manager.recent_executions(metrics.history_len).await;
        let last_of = |id: &StrategyId| recent.iter().find(|e| e.success && &e.strategy_id == id).map(|e| e.metrics.clone());
        if let (Some(baseline), Some(candidate)) = (last_of(&primary), last_of(&best.id)) {
            let review = ShadowReview::new(Arc::new(FlagGate { approve }));
            let outcome = review.propose_upgrade("simulated task", &baseline, &candidate).await;
            if outcome == UpgradeOutcome::Approved {
                manager.disable_strategy(&primary).await?;
                println!("Primary '{}' retired in favour of '{}'", primary, best.id);
            }
        }
    }

    manager.stop().await;
    Ok(())
}
