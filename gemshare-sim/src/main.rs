//! gemshare session simulator
//!
//! Runs the shared-wallet engine against an in-memory co-op scene and
//! prints what it did.
//!
//! Usage:
//!   gemshare-sim --wallets 50,0 --duration-secs 12
//!
//! Pass `--config` to load engine settings and `--script` to replay your
//! own pickups and purchases.

use anyhow::Result;
use clap::Parser;
use gemshare_sim::{default_script, load_config, load_script, run, DemoWorld};
use std::{path::PathBuf, time::Duration};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "gemshare-sim")]
#[command(about = "Simulates a co-op session with shared gem wallets")]
struct Args {
    /// Starting wallet of each player, comma-separated
    #[arg(short, long, value_delimiter = ',', default_value = "50,0")]
    wallets: Vec<i64>,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script of wallet changes (JSON array of {at_ms, player, delta})
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// How long to run the session
    #[arg(short, long, default_value = "12")]
    duration_secs: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(args.config.as_deref())?;
    let script = match &args.script {
        Some(path) => load_script(path)?,
        None => default_script(args.wallets.len()),
    };

    info!(
        "gemshare-sim starting: {} player(s), {} scripted change(s)",
        args.wallets.len(),
        script.len()
    );
    let world = DemoWorld::build(&args.wallets);
    let report = run(&world, config, &script, Duration::from_secs(args.duration_secs)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n========================================");
    println!("  gemshare session report");
    println!("========================================");
    println!("  Players bound:    {}", report.players_bound);
    println!("  Initial merge:    {}", if report.merged { "yes" } else { "no" });
    println!("  Mirror passes:    {}", report.mirrors);
    println!("  Reconcile writes: {}", report.reconcile_writes);
    for (label, root) in &report.labels {
        println!("  {label}: {root}");
    }
    println!("  Final wallets:    {:?}", report.final_wallets);
    println!("========================================\n");
    Ok(())
}
