mod api;
mod config;
mod error;
mod logging;
mod models;
mod output;
mod pivot;
mod sampler;
mod service;
mod ui;
mod window;

use crate::config::{ensure_initialized, load_config, AppConfig};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use error::AppError;
use output::Format;
use pivot::{MergePolicy, PivotOptions, RowOrder};
use sampler::{Producer, SimulatedSource};
use service::DashboardService;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use tokio::sync::mpsc;
use ui::app::{headless_line, LiveState};
use ui::run::run_tui;

#[derive(Debug, Parser)]
#[command(name = "billing-dash")]
#[command(about = "Billing, usage and live operations dashboard")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Init,
    /// Daily usage cost, one column per resource type.
    Usage {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Order rows by date instead of first appearance.
        #[arg(long)]
        sorted: bool,
        /// Add up duplicate date/resource rows instead of keeping the last.
        #[arg(long)]
        sum: bool,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    Billing {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    Trend {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    Health,
    /// Live throughput, latency and error-rate windows.
    Live {
        #[arg(long)]
        capacity: Option<usize>,
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Print one line per tick instead of opening the dashboard.
        #[arg(long)]
        headless: bool,
        /// Stop after this many ticks (headless only).
        #[arg(long, default_value_t = 10)]
        ticks: u64,
    },
}

fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::InvalidArgument(format!("--{flag} must be a YYYY-MM-DD date, got '{raw}'"))
    })
}

fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let end = match end {
        Some(raw) => parse_date("end", raw)?,
        None => today,
    };
    let start = match start {
        Some(raw) => parse_date("start", raw)?,
        None => end - Duration::days(30),
    };
    if start > end {
        return Err(AppError::InvalidArgument(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok((start, end))
}

fn resolve_customer(flag: Option<String>, cfg: &AppConfig) -> Result<String, AppError> {
    flag.or_else(|| cfg.customer_id.clone())
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            AppError::InvalidArgument(
                "a customer id is required (pass --customer or set customer_id)".into(),
            )
        })
}

fn apply_live_overrides(
    cfg: &mut AppConfig,
    capacity: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<(), AppError> {
    if let Some(capacity) = capacity {
        cfg.window_capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| AppError::InvalidArgument("--capacity must be at least 1".into()))?
            .get();
    }
    if let Some(interval_ms) = interval_ms {
        if interval_ms == 0 {
            return Err(AppError::InvalidArgument(
                "--interval-ms must be at least 1".into(),
            ));
        }
        cfg.sample_interval_ms = interval_ms;
    }
    Ok(())
}

async fn run_headless(cfg: &AppConfig, ticks: u64) -> Result<(), AppError> {
    let mut state = LiveState::new(cfg.capacity()?, cfg.sample_interval());
    let (tx, mut rx) = mpsc::channel(16);
    let producer = Producer::start(SimulatedSource::new(), state.interval, tx);

    while state.ticks < ticks {
        let Some(batch) = rx.recv().await else {
            break;
        };
        state.apply(&batch);
        println!("{}", headless_line(&state));
    }

    producer.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let fullscreen = matches!(cli.command, Commands::Live { headless: false, .. });
    logging::init_logging(cli.verbose, fullscreen);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Init => {
            ensure_initialized()?;
            println!("Initialized billing-dash config directory.");
        }
        Commands::Usage {
            customer,
            start,
            end,
            sorted,
            sum,
            format,
        } => {
            let cfg = load_config()?;
            let customer = resolve_customer(customer, &cfg)?;
            let (start, end) =
                resolve_range(start.as_deref(), end.as_deref(), Utc::now().date_naive())?;
            let options = PivotOptions {
                merge: if sum {
                    MergePolicy::Sum
                } else {
                    MergePolicy::LastWriteWins
                },
                order: if sorted {
                    RowOrder::Chronological
                } else {
                    RowOrder::FirstSeen
                },
            };

            let svc = DashboardService::from_config(&cfg)?;
            let report = svc.usage_series(&customer, start, end, options).await?;
            println!("{}", output::render_pivot(&report, format)?);
            if !report.malformed.is_empty() {
                eprintln!(
                    "skipped {} usage cost value(s) that were not numbers",
                    report.malformed.len()
                );
            }
            if !report.overflowed.is_empty() {
                eprintln!(
                    "left {} usage cost value(s) out of totals that would overflow",
                    report.overflowed.len()
                );
            }
        }
        Commands::Billing {
            customer,
            page,
            size,
            format,
        } => {
            let cfg = load_config()?;
            let customer = resolve_customer(customer, &cfg)?;
            let size = size.unwrap_or(cfg.page_size);
            let svc = DashboardService::from_config(&cfg)?;
            let records = svc.billing_page(&customer, page, size).await?;
            println!("{}", output::render_billing(&records, page, size, format)?);
        }
        Commands::Trend { days, format } => {
            let cfg = load_config()?;
            let svc = DashboardService::from_config(&cfg)?;
            let points = svc.cost_trend(days.unwrap_or(cfg.trend_days)).await?;
            println!("{}", output::render_trend(&points, format)?);
        }
        Commands::Health => {
            let cfg = load_config()?;
            let svc = DashboardService::from_config(&cfg)?;
            let mut all_up = true;
            for report in svc.health().await {
                match report.status {
                    Ok(code) => println!(
                        "{:<10} up (HTTP {code}, {} ms)",
                        report.service, report.duration_ms
                    ),
                    Err(err) => {
                        all_up = false;
                        println!("{:<10} {err}", report.service);
                    }
                }
            }
            if !all_up {
                return Err(AppError::unavailable(
                    "backend",
                    "one or more services are down",
                ));
            }
        }
        Commands::Live {
            capacity,
            interval_ms,
            headless,
            ticks,
        } => {
            let mut cfg = load_config()?;
            apply_live_overrides(&mut cfg, capacity, interval_ms)?;

            if headless {
                run_headless(&cfg, ticks).await?;
            } else {
                run_tui(&cfg).await?;
            }
        }
    }

    Ok(())
}
