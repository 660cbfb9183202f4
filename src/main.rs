//! Balance simulator CLI.
//!
//! Run with: cargo run --release -- --minutes 60 --clicks-per-second 5

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use heart_clicker::catalog::{load_catalog_from_env, Catalog};
use heart_clicker::config::{load_config_from_env, EngineConfig};
use heart_clicker::format::{format_currency, format_eta, format_rate};
use heart_clicker::simulator::{simulate, SimulationParams, SimulationReport};

#[derive(Parser, Debug)]
#[command(author, version, about = "Greedy balance simulator for the heart clicker economy", long_about = None)]
struct Args {
    /// Seed for the bonus rolls
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Manual clicks per simulated second
    #[arg(long, default_value_t = 5)]
    clicks_per_second: u32,

    /// Simulated play time in minutes
    #[arg(long, default_value_t = 60)]
    minutes: u32,

    /// Upgrade catalog JSON (defaults to HEART_CLICKER_CATALOG_PATH or the built-in one)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Engine config JSON (defaults to HEART_CLICKER_CONFIG_PATH or the built-in one)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => Arc::new(
            Catalog::from_file(path)
                .with_context(|| format!("Failed to load catalog at {}", path.display()))?,
        ),
        None => load_catalog_from_env(),
    };
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load engine config at {}", path.display()))?,
        None => load_config_from_env(),
    };

    let params = SimulationParams {
        seed: args.seed,
        clicks_per_second: args.clicks_per_second,
        seconds: args.minutes.saturating_mul(60),
    };
    let report = simulate(catalog, config, &params);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("========================================");
    println!("  バランスシミュレーター (seed {})", report.seed);
    println!("  クリック速度: {}/秒", report.clicks_per_second);
    println!("  プレイ時間: {}", format_eta(report.seconds as f64));
    println!("========================================");
    for reached in &report.levels {
        println!(
            "  Lv{:<3} {}",
            reached.level,
            format_eta(reached.second as f64)
        );
    }
    println!("----------------------------------------");
    println!("  所持: {}", format_currency(report.final_currency));
    println!("  自動: {}/s", format_rate(report.final_auto_rate));
    println!("  クリック: {}", report.final_click_power);
    println!(
        "  購入 {} 回 (最大待ち時間 {})",
        report.total_purchases,
        format_eta(report.max_idle_gap as f64)
    );
    for (id, count) in &report.purchases {
        println!("    {:<16} x{}", id, count);
    }
    println!(
        "  ラッキー {} 回 / フィーバー {} 回",
        report.lucky_claimed, report.fevers
    );
    if report.completed {
        println!("  コンプリート!");
    }
}
