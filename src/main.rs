use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use da_desk::performance::{photo_audit_countdown, weekly_stats, PerformanceRules};
use da_desk::{
    config, init_config, init_telemetry, ActionPanel, Collaborators, DeliveryOutcome, InventorySnapshot,
    ManualClock, Order, ProofKind, Step, StrikeLedger, TracingCollaborators, Violation,
    WorkflowStatus,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "da-desk")]
#[command(about = "Delivery agent action desk")]
#[command(long_about = "Drives the five-step delivery workflow (acknowledge, call, out for delivery, \
                       proofs, OTP) for an order and summarises weekly agent performance.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one order through the delivery workflow and print the step log
    Simulate {
        /// Order record as JSON
        #[arg(long)]
        order: PathBuf,
        /// Decline the assignment for lack of stock
        #[arg(long)]
        decline: bool,
        /// Agent stock snapshot as JSON; the assignment is declined when it cannot cover the order
        #[arg(long)]
        inventory: Option<PathBuf>,
        /// Upload the assignment proof before the payment proof
        #[arg(long)]
        assignment_proof: bool,
        /// OTP the customer reads out
        #[arg(long, default_value = "1234")]
        otp: String,
        /// Hours between out-for-delivery and OTP entry
        #[arg(long, default_value = "4", allow_negative_numbers = true)]
        transit_hours: f64,
        /// Let the bonus banner and auto-close timers run out instead of closing immediately
        #[arg(long)]
        wait: bool,
    },
    /// Summarise a week of delivery outcomes
    Weekly {
        /// JSON array of delivery outcomes
        #[arg(long)]
        deliveries: PathBuf,
        /// JSON array of violations on record
        #[arg(long)]
        violations: Option<PathBuf>,
        #[arg(long, default_value = "agent")]
        agent: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config()?;
    init_telemetry(&settings.observability.log_level)?;
    init_config()?;

    match cli.command {
        Commands::Simulate {
            order,
            decline,
            inventory,
            assignment_proof,
            otp,
            transit_hours,
            wait,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            let options = SimulateOptions {
                decline,
                inventory,
                assignment_proof,
                otp,
                transit_hours,
                wait,
            };
            simulate_command(&order, options).await
        }),
        Commands::Weekly {
            deliveries,
            violations,
            agent,
        } => weekly_command(&deliveries, violations.as_deref(), &agent),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

struct SimulateOptions {
    decline: bool,
    inventory: Option<PathBuf>,
    assignment_proof: bool,
    otp: String,
    transit_hours: f64,
    wait: bool,
}

/// Converts `--transit-hours` into clock time, rejecting values the clock cannot move by.
fn transit_duration(hours: f64) -> Result<Duration> {
    if !hours.is_finite() || hours < 0.0 {
        anyhow::bail!("--transit-hours must be a finite, non-negative number of hours, got {hours}");
    }
    let seconds = (hours * 3600.0).round();
    if seconds > i64::MAX as f64 {
        anyhow::bail!("--transit-hours {hours} is too large");
    }
    Duration::try_seconds(seconds as i64).with_context(|| format!("--transit-hours {hours} is too large"))
}

async fn simulate_command(order_path: &Path, options: SimulateOptions) -> Result<()> {
    let settings = config()?;
    let transit = transit_duration(options.transit_hours)?;
    let order: Order = read_json(order_path)?;

    let mut decline = options.decline;
    if let Some(path) = &options.inventory {
        let snapshot: InventorySnapshot = read_json(path)?;
        for line in snapshot.low_stock(&settings.stock_thresholds()) {
            info!(item = %line.item, remaining = line.remaining(), "Low stock");
        }
        for shortfall in snapshot.shortfalls(&order) {
            warn!(
                item = %shortfall.item,
                assigned = shortfall.assigned,
                available = shortfall.available,
                "Not enough stock for assignment"
            );
            decline = true;
        }
    }

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let collaborators = Collaborators::uniform(Arc::new(TracingCollaborators));

    let mut panel = ActionPanel::open(order, settings.workflow_rules(), collaborators, clock.clone())?;

    let status = panel.acknowledge_assignment(!decline).await?;
    if status == WorkflowStatus::Pending(Step::CallCustomer) {
        panel.call_customer().await?;
        panel.mark_out_for_delivery().await?;
        if options.assignment_proof {
            panel.upload_proof(ProofKind::Assignment).await?;
        }
        panel.upload_proof(ProofKind::Payment).await?;

        clock.advance(transit);
        panel.submit_otp_code(&options.otp).await?;
    }

    if options.wait {
        panel.settle().await;
    } else {
        panel.close().await;
    }

    let report = json!({
        "correlationId": panel.correlation_id(),
        "expected": panel.state().order().assigned_items_summary(),
        "stepLog": panel
            .state()
            .step_log()
            .iter()
            .map(|(step, record)| (step.number().to_string(), record.to_string()))
            .collect::<std::collections::BTreeMap<_, _>>(),
        "outcome": panel.outcome(),
        "panel": panel.phase(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn weekly_command(deliveries: &Path, violations: Option<&Path>, agent: &str) -> Result<()> {
    let settings = config()?;
    let rules = PerformanceRules::from(settings);

    let outcomes: Vec<DeliveryOutcome> = read_json(deliveries)?;
    let violations: Vec<Violation> = match violations {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let ledger = StrikeLedger::with_history(agent, settings.performance.max_strikes, violations);

    let stats = weekly_stats(&outcomes, ledger.strikes(), &rules);
    let report = json!({
        "agent": agent,
        "stats": stats,
        "totalBonusNaira": stats.total_bonus_naira(),
        "standing": ledger.standing(),
        "photoAuditIn": photo_audit_countdown(Local::now().naive_local(), &rules).to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
