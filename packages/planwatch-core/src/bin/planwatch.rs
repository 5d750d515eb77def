//! Planwatch CLI - portfolio plan status and decision journal.
//!
//! Every command prints a JSON `ApiResponse` envelope on stdout; logs go to stderr.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use planwatch_core::{
    calc_all_triggers, calculate_score, derive_position_stage, Action, ApiResponse, Asset,
    DecisionEntry, JsonStore, MarketSnapshot, PortfolioSummary, PositionStage, StrategyConfig,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "planwatch")]
#[command(about = "Track a portfolio against its investment plan")]
#[command(version)]
struct Cli {
    /// Data directory holding holdings.json, prices.json and decisions.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Strategy plan file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Positions, allocations and plan progress
    Summary,
    /// Market trigger states
    Triggers,
    /// Market snapshot as it would be attached to a decision now
    Snapshot {
        /// Plan stage (derived from the BTC price when omitted)
        #[arg(short, long)]
        stage: Option<PositionStage>,
    },
    /// Record a trading decision
    Record {
        /// Asset traded (btc, eth, sol, link, mstr)
        #[arg(short, long)]
        asset: Asset,
        /// buy, sell or rebalance
        #[arg(short = 'x', long)]
        action: Action,
        /// Position size before the decision (USD)
        #[arg(short, long)]
        before: f64,
        /// Position size after the decision (USD)
        #[arg(short = 'f', long)]
        after: f64,
        /// Plan stage (derived from the BTC price when omitted)
        #[arg(short, long)]
        stage: Option<PositionStage>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Plan adherence score over the decision log
    Score,
    /// Show the active strategy plan
    Config,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let output = match run(cli) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("{:#}", e);
            envelope(&ApiResponse::<()>::err(format!("{:#}", e)))
        }
    };

    println!("{}", output);
}

fn envelope<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"{}"}}"#, e))
}

fn ok<T: Serialize>(data: T) -> Result<String> {
    Ok(envelope(&ApiResponse::ok(data)))
}

fn stage_or_derived(
    stage: Option<PositionStage>,
    btc_price: Option<f64>,
    config: &StrategyConfig,
) -> PositionStage {
    stage
        .or_else(|| derive_position_stage(btc_price, config))
        .unwrap_or_else(|| {
            tracing::warn!("No BTC price to derive the plan stage from, assuming accumulate");
            PositionStage::Accumulate
        })
}

fn run(cli: Cli) -> Result<String> {
    let store = cli
        .data_dir
        .map(JsonStore::with_dir)
        .unwrap_or_default();
    let config_path = cli.config.unwrap_or_else(StrategyConfig::default_path);
    let config = StrategyConfig::load(&config_path)?;

    match cli.command {
        Commands::Summary => {
            let holdings = store.load_holdings()?;
            holdings.validate()?;
            let prices = store.load_prices()?;
            ok(PortfolioSummary::build(&holdings, &prices, &config))
        }
        Commands::Triggers => {
            let holdings = store.load_holdings()?;
            let prices = store.load_prices()?;
            ok(json!({
                "triggers": calc_all_triggers(&prices, holdings.nupl),
                "fetched_at": prices.fetched_at,
            }))
        }
        Commands::Snapshot { stage } => {
            let holdings = store.load_holdings()?;
            let prices = store.load_prices()?;
            let stage = stage_or_derived(stage, prices.price(Asset::Btc), &config);
            ok(MarketSnapshot::capture(&prices, holdings.nupl, stage, &config))
        }
        Commands::Record {
            asset,
            action,
            before,
            after,
            stage,
            notes,
        } => {
            let holdings = store.load_holdings()?;
            let prices = store.load_prices()?;
            let stage = stage_or_derived(stage, prices.price(Asset::Btc), &config);
            let snapshot = MarketSnapshot::capture(&prices, holdings.nupl, stage, &config);

            let mut entry = DecisionEntry::record(
                uuid::Uuid::new_v4().to_string(),
                Utc::now(),
                asset,
                action,
                before,
                after,
                snapshot,
            );
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }
            store.append_decision(&entry)?;
            ok(json!({ "decision": entry }))
        }
        Commands::Score => {
            let decisions = store.load_decisions()?;
            ok(calculate_score(&decisions))
        }
        Commands::Config => ok(json!({
            "path": config_path,
            "strategy": config,
        })),
    }
}
