use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{generate_default_config, Config, LoggingConfig};
use crate::controller::{Controller, Recomputed};
use crate::presenter::JsonPresenter;

mod age;
mod aggregate;
mod category;
mod config;
mod controller;
mod csv_reader;
mod dataset;
mod error;
mod filter;
mod presenter;
mod ui;

#[derive(Parser)]
#[command(name = "survey_dash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Survey dashboard: top technologies per category and respondents per country")]
struct Cli {
    /// Config file (default: ./survey_dash.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Survey CSV file
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Number of entries in each top chart series
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Print the charts as JSON and exit instead of opening the dashboard
    #[arg(long)]
    snapshot: bool,

    /// Category for the snapshot (default: first one)
    #[arg(long, requires = "snapshot")]
    category: Option<String>,

    /// Raw age value to filter the snapshot on; repeatable
    #[arg(long = "age", requires = "snapshot")]
    ages: Vec<String>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(config: &LoggingConfig, interactive: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("survey_dash={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    // the dashboard owns the terminal, so logs never go to stderr there
    match &config.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None if interactive => registry.with(fmt::layer().with_writer(io::sink)).init(),
        None => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default()?,
    };
    if let Some(path) = cli.data {
        config.data.path = path;
    }
    if let Some(n) = cli.top_n {
        config.charts.top_n = n;
    }
    config.validate()?;

    init_logging(&config.logging, !cli.snapshot)?;
    info!("survey_dash v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config.source {
        info!("Loaded config from {:?}", path);
    }
    for warning in &config.warnings {
        warn!("{}", warning);
    }

    let dataset = csv_reader::read_data(&config.data.path, &config.load_options())
        .context("survey data could not be loaded")?;
    let mut controller = Controller::new(Arc::new(dataset), config.chart_settings())
        .context("dashboard cannot start")?;

    if !cli.snapshot {
        ui::run(&mut controller, Duration::from_millis(config.ui.tick_rate_ms))?;
        return Ok(());
    }

    if let Some(name) = &cli.category {
        if let Err(e) = controller.select_category(name) {
            let known: Vec<_> = controller.categories().iter().map(|c| c.to_string()).collect();
            bail!("{}; known categories: {}", e, known.join(", "));
        }
    }
    if !cli.ages.is_empty() {
        for age in &cli.ages {
            if !controller.age_options().iter().any(|o| &o.value == age) {
                warn!(age = age.as_str(), "age value not present in dataset");
            }
        }
        controller.set_ages(cli.ages);
    }

    let mut presenter = JsonPresenter::new(io::stdout().lock());
    controller.publish(&mut presenter, &Recomputed::all())?;
    info!(
        category = %controller.state().selected_category(),
        ages = controller.state().selected_ages().len(),
        "writing snapshot"
    );
    drop(presenter.finish()?);
    Ok(())
}
