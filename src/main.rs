use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use signal_engine::{
    models::{PricesRequest, SettlementRequest},
    Area, ArbitrageDetector, BatteryRoiCalculator, BatterySpec, SettlementCalculator, SignalEngine, SpreadBasis,
};
use std::path::{Path, PathBuf};

mod batch_processor;
mod data_loader;

use batch_processor::{BatchOutcome, BatchProcessor};

#[derive(Parser)]
#[command(name = "grid_signals")]
#[command(about = "Trading signals, load shifts, battery ROI and settlement for JEPX areas")]
struct Args {
    /// Engine configuration JSON (omitted fields keep defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze every spot/demand artifact pair under a directory
    Analyze {
        #[arg(long)]
        data_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },
    /// Settle a consumption profile against an area's prices
    Settle {
        /// Profile as JSON [{ts, kwh}] or CSV with a ts,kwh header
        #[arg(long)]
        profile: PathBuf,

        /// tokyo or kansai
        #[arg(long, default_value = "tokyo")]
        area: String,

        /// Price date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// PV offset fraction (0.0-1.0)
        #[arg(long, default_value = "0.0")]
        pv: f64,

        /// Spot price artifact; the time-of-day model is used without it
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Write the response here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Project battery payback and ROI
    Roi {
        #[arg(long)]
        capacity_mwh: Option<f64>,

        #[arg(long)]
        cycles: Option<f64>,

        /// Round-trip efficiency (0-1]
        #[arg(long)]
        efficiency: Option<f64>,

        /// Capital cost in JPY
        #[arg(long)]
        capital_cost: Option<f64>,

        /// Average spread in JPY/kWh
        #[arg(long, conflicts_with = "prices")]
        spread: Option<f64>,

        /// Spot price artifact to derive the spread from
        #[arg(long)]
        prices: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;
    info!("Using {} worker threads", num_cpus::get());

    let config = data_loader::load_config(args.config.as_deref())?;

    match args.command {
        Command::Analyze { data_dir, output } => {
            let processor = BatchProcessor::new(SignalEngine::new(config));
            let outcomes = processor.run(&data_dir)?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
                OutputFormat::Summary => print_summary(&outcomes),
            }
        }
        Command::Settle {
            profile,
            area,
            date,
            pv,
            prices,
            output,
        } => {
            let area: Area = area.parse()?;
            NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;

            info!("Running settlement: area {}, date {}, pv offset {:.1}%", area, date, pv * 100.0);

            let request = SettlementRequest {
                profile: data_loader::load_profile(&profile)?,
                prices: PricesRequest { area, date },
                pv_offset_pct: pv,
            };
            let reference = match prices {
                Some(path) => Some(data_loader::load_spot(&path)?.into_reference()),
                None => None,
            };

            let result = SettlementCalculator::new(config.settlement).settle_request(&request, reference)?;

            info!("Period: {} to {}", result.period.from, result.period.to);
            info!("Total kWh: {:.1}", result.totals.consumption_kwh);
            info!("Total cost: ¥{:.1}", result.totals.cost);

            let json = serde_json::to_string_pretty(&result)?;
            match output {
                Some(path) => write_output(&path, &json)?,
                None => println!("{}", json),
            }
        }
        Command::Roi {
            capacity_mwh,
            cycles,
            efficiency,
            capital_cost,
            spread,
            prices,
        } => {
            let defaults = config.battery.spec;
            let spec = BatterySpec::new(
                capacity_mwh.unwrap_or(defaults.capacity_mwh),
                cycles.unwrap_or(defaults.cycles_per_day),
                efficiency.unwrap_or(defaults.efficiency),
                capital_cost.unwrap_or(defaults.capital_cost),
            );
            let calculator =
                BatteryRoiCalculator::new(config.battery.clone()).with_precision(config.settlement.precision);

            let (roi, basis) = match (spread, prices) {
                (_, Some(path)) => {
                    let spot = data_loader::load_spot(&path)?;
                    let opportunities =
                        ArbitrageDetector::new(config.arbitrage.clone()).detect(&spot.price_yen_per_kwh)?;
                    info!("{} opportunities in {}", opportunities.len(), path.display());
                    calculator.project_from_opportunities(&spec, &opportunities)?
                }
                (Some(spread), None) => (
                    calculator.project(&spec, spread)?,
                    SpreadBasis::Observed(spread),
                ),
                (None, None) => calculator.project_from_opportunities(&spec, &[])?,
            };

            if basis.is_fallback() {
                log::warn!("No spread available, using fallback of ¥{:.2}/kWh", basis.value());
            }
            if !roi.pays_back() {
                log::warn!("Battery never pays back at this spread");
            }

            let report = serde_json::json!({ "spread": basis, "roi": roi });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn write_output(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Result written to {} ({} bytes)", path.display(), json.len());
    Ok(())
}

fn print_summary(outcomes: &[BatchOutcome]) {
    println!("Trading Signal Summary");
    println!("======================");

    for outcome in outcomes {
        let Some(analysis) = &outcome.analysis else {
            println!(
                "{} {}: FAILED ({})",
                outcome.area,
                outcome.date,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            continue;
        };

        println!();
        println!("{} {}", outcome.area, outcome.date);
        if let Some(stats) = &analysis.price_stats {
            println!(
                "  Prices: ¥{:.2} - ¥{:.2} (avg ¥{:.2})",
                stats.min_price, stats.max_price, stats.avg_price
            );
        }
        match &analysis.metrics {
            Some(metrics) => {
                println!("  Opportunities: {}", metrics.total_opportunities);
                println!("  Avg spread: ¥{:.2}/kWh", metrics.average_arbitrage_spread);
                println!(
                    "  Load shift savings: ¥{:.0}/day (¥{:.0}/month)",
                    metrics.estimated_daily_savings, metrics.estimated_monthly_savings
                );
                println!("  Carbon reduction: {:.1} kg", metrics.carbon_reduction_potential);
                println!("  Suggested battery: {:.0} MWh", metrics.optimal_battery_size);
            }
            None => println!("  No arbitrage opportunities"),
        }
        for opp in &analysis.best_opportunities {
            println!("    {}", opp.recommendation_text);
        }
        for rec in &analysis.priority_load_shifts {
            println!("    {}", rec.reason_text);
        }

        let roi = &analysis.battery_roi;
        let payback = if roi.pays_back() {
            format!("{:.1} years", roi.payback_years)
        } else {
            "never".to_string()
        };
        println!(
            "  Battery: ¥{:.1}/day, payback {}, ROI {:.1}% ({:?})",
            roi.daily_profit, payback, roi.roi_pct, analysis.spread_basis
        );
    }
}
