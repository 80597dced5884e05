use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use stock_dashboard::config::AppConfig;
use stock_dashboard::dashboard::{DashboardState, DashboardView, PRICE_SERIES, SeriesView};
use stock_dashboard::loader::Dataset;
use stock_dashboard::models::{InvestorClass, Period, SeriesRecord};
use stock_dashboard::utils::{self, fmt_number};

#[derive(Parser)]
#[command(name = "stock-dashboard", about = "Price and shareholder dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory with price.csv / individual.csv / foreign.csv / institutional.csv
    /// (default: bundled sample data)
    #[arg(long, global = true, env = "DASHBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct ViewArgs {
    /// 6M, 1Y, 2Y or 5Y (anything else shows the full history)
    #[arg(short, long)]
    period: Option<Period>,

    /// Date treated as "now" (default: configured reference date, else today)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeriesArg {
    Price,
    Individual,
    Foreign,
    Institutional,
    All,
}

impl SeriesArg {
    fn name(self) -> Option<&'static str> {
        match self {
            SeriesArg::Price => Some(PRICE_SERIES),
            SeriesArg::Individual => Some(InvestorClass::Individual.name()),
            SeriesArg::Foreign => Some(InvestorClass::Foreign.name()),
            SeriesArg::Institutional => Some(InvestorClass::Institutional.name()),
            SeriesArg::All => None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print stat cards and the filtered series
    Show {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Emit the filtered series as JSON for a chart renderer
    Export {
        #[command(flatten)]
        view: ViewArgs,

        #[arg(short, long, value_enum, default_value = "all")]
        series: SeriesArg,

        #[arg(long)]
        pretty: bool,
    },

    /// Load the data and report rejected rows
    Validate,

    /// List period tokens
    Periods,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "stock_dashboard=info,warn",
        1 => "stock_dashboard=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if cli.data_dir.is_some() {
        config.data.dir = cli.data_dir;
    }

    match cli.command {
        Command::Show { view } => {
            let _t = utils::Timer::start("Render dashboard");
            let dataset = load_dataset(&config)?;
            let state = state_from(&config, &view);
            print_dashboard(&DashboardView::build(&dataset, &state));
        }

        Command::Export { view, series, pretty } => {
            let dataset = load_dataset(&config)?;
            let state = state_from(&config, &view);
            let payload = DashboardView::build(&dataset, &state).export(series.name())?;
            let json = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{}", json);
        }

        Command::Validate => {
            let dataset = load_dataset(&config)?;
            let mut bad = 0usize;
            for report in &dataset.reports {
                println!(
                    "{:<40} {:>5} accepted  {:>3} rejected  {:>3} unreadable",
                    report.source,
                    report.accepted,
                    report.rejected.len(),
                    report.unreadable
                );
                for e in &report.rejected {
                    println!("    {}", e);
                }
                if !report.is_clean() {
                    bad += 1;
                }
            }
            if bad > 0 {
                bail!("{} file(s) with rejected rows", bad);
            }
            info!("All {} files clean", dataset.reports.len());
        }

        Command::Periods => {
            for p in Period::ALL {
                println!("  {}  {}", p.token(), p.label());
            }
        }
    }

    Ok(())
}

fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    match &config.data.dir {
        Some(dir) => Dataset::load_dir(dir, config.data.synth_seed),
        None => Dataset::bundled(config.data.synth_seed),
    }
}

fn state_from(config: &AppConfig, view: &ViewArgs) -> DashboardState {
    let reference = view
        .as_of
        .or(config.dashboard.reference_date)
        .unwrap_or_else(|| Local::now().date_naive());
    DashboardState::new(view.period.unwrap_or(config.dashboard.default_period), reference)
}

fn print_dashboard(view: &DashboardView) {
    println!("─────────────────────────────────────────────────────");
    println!(
        "  Dashboard — {} ({}), as of {}",
        view.period,
        view.period.label(),
        view.reference_date
    );
    println!("─────────────────────────────────────────────────────");
    for card in view.cards() {
        println!(
            "  {:<24} {:>12}  {}",
            card.title,
            card.value,
            card.change_label().unwrap_or_default()
        );
    }
    println!("─────────────────────────────────────────────────────");

    print_range(PRICE_SERIES, &view.price);
    println!("  {:<12} {:>9} {:>9} {:>9} {:>9}", "date", "open", "high", "low", "close");
    for r in &view.price.filtered.series {
        println!(
            "  {:<12} {:>9} {:>9} {:>9} {:>9}",
            r.date.to_string(),
            fmt_number(r.open.round() as i64),
            fmt_number(r.high.round() as i64),
            fmt_number(r.low.round() as i64),
            fmt_number(r.close.round() as i64),
        );
    }

    for (class, series) in &view.ownership {
        println!();
        print_range(class.name(), series);
        for r in &series.filtered.series {
            println!(
                "  {:<12} {:>6.1}% {:>12}",
                r.date.to_string(),
                r.percentage,
                fmt_number(r.volume as i64)
            );
        }
    }
}

fn print_range<T: SeriesRecord>(name: &str, view: &SeriesView<T>) {
    let series = &view.filtered.series;
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => println!(
            "  {}: {} → {} ({} points)",
            name,
            first.date(),
            last.date(),
            series.len()
        ),
        _ => println!("  {}: —", name),
    }
}
