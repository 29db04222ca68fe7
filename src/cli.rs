//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, read_event_log};
use crate::adapters::csv_record_adapter::CsvRecordSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::replay_engine::{ReplayEngine, ReplayEvent, ReplayOutcome, run_replay};
use crate::domain::config::{PortfolioConfig, build_portfolio_config, validate_portfolio_config};
use crate::domain::error::LedgerError;
use crate::domain::manager::PortfolioManager;
use crate::domain::sizing::SizingPolicy;
use crate::domain::summary::BookSummary;
use crate::ports::record_port::RecordSink;

#[derive(Parser, Debug)]
#[command(
    name = "tradeledger",
    about = "Portfolio and order-lifecycle replay for backtests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a signal/fill event log through the portfolio manager
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        /// Event log, overrides [replay] events
        #[arg(short, long)]
        events: Option<PathBuf>,
        /// Bar directory, overrides [replay] bars_dir
        #[arg(short, long)]
        bars: Option<PathBuf>,
        /// CSV record export, overrides [export] csv
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fill every dispatched order immediately
        #[arg(long)]
        auto_fill: bool,
    },
    /// Validate a portfolio configuration and its event log
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line overrides applied on top of the INI file.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub events: Option<PathBuf>,
    pub bars: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub auto_fill: bool,
}

/// Result of a finished replay: the manager with every book, and the counts.
#[derive(Debug)]
pub struct ReplayReport {
    pub manager: PortfolioManager,
    pub outcome: ReplayOutcome,
    /// Records written per sink; zero when the sink is not configured.
    pub csv_records: usize,
    pub sqlite_records: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Replay {
            config,
            events,
            bars,
            output,
            auto_fill,
        } => run_replay_command(
            &config,
            &ReplayOptions {
                events,
                bars,
                output,
                auto_fill,
            },
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<PortfolioConfig, LedgerError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_portfolio_config(&adapter)?;
    build_portfolio_config(&adapter)
}

/// Manager with every configured strategy registered.
pub fn build_manager(config: &PortfolioConfig) -> Result<PortfolioManager, LedgerError> {
    let mut manager = PortfolioManager::new(config.policy);
    for name in &config.strategies {
        manager.register_strategy(name)?;
    }
    Ok(manager)
}

/// Engine clocked at `start`, holding every bar series found under `bars_dir`.
pub fn build_engine(
    bars_dir: Option<&Path>,
    start: NaiveDateTime,
) -> Result<ReplayEngine, LedgerError> {
    let mut engine = ReplayEngine::new(start);
    if let Some(dir) = bars_dir {
        let adapter = CsvAdapter::new(dir.to_path_buf());
        for instrument in adapter.list_instruments()? {
            let bars = adapter.load_bars(&instrument)?;
            info!(instrument = %instrument, bars = bars.len(), "loaded bars");
            engine = engine.with_bars(&instrument, bars);
        }
    }
    Ok(engine)
}

fn first_clock(events: &[ReplayEvent]) -> NaiveDateTime {
    match events.first() {
        Some(ReplayEvent::Signal(s)) => s.datetime,
        Some(ReplayEvent::Fill(f)) => f.datetime,
        None => NaiveDateTime::default(),
    }
}

fn events_path(config: &PortfolioConfig, options: &ReplayOptions) -> Result<PathBuf, LedgerError> {
    options
        .events
        .clone()
        .or_else(|| config.replay.events.clone())
        .ok_or_else(|| LedgerError::ConfigMissing {
            section: "replay".to_string(),
            key: "events".to_string(),
        })
}

/// Every signal in the log must belong to a configured strategy.
fn check_event_strategies(
    config: &PortfolioConfig,
    events: &[ReplayEvent],
) -> Result<(), LedgerError> {
    for event in events {
        if let ReplayEvent::Signal(signal) = event {
            if !config.strategies.contains(&signal.strategy_name) {
                return Err(LedgerError::UnknownStrategy {
                    name: signal.strategy_name.clone(),
                });
            }
        }
    }
    Ok(())
}

pub fn run_replay_pipeline(
    config: &PortfolioConfig,
    options: &ReplayOptions,
) -> Result<ReplayReport, LedgerError> {
    let events_path = events_path(config, options)?;
    let bars_dir = options.bars.clone().or_else(|| config.replay.bars_dir.clone());
    if matches!(config.policy, SizingPolicy::BarLimit { .. }) && bars_dir.is_none() {
        return Err(LedgerError::ConfigMissing {
            section: "replay".to_string(),
            key: "bars_dir".to_string(),
        });
    }

    // Stage 1: event log
    let events = read_event_log(&events_path)?;
    info!(path = %events_path.display(), events = events.len(), "loaded event log");

    // Stage 2: manager and engine
    let mut manager = build_manager(config)?;
    let mut engine = build_engine(bars_dir.as_deref(), first_clock(&events))?;

    // Stage 3: replay
    let auto_fill = options.auto_fill || config.replay.auto_fill;
    let outcome = run_replay(&mut manager, &mut engine, events, auto_fill)?;

    // Stage 4: export
    let records = manager.records();
    let mut csv_records = 0;
    if let Some(path) = options.output.as_ref().or(config.export.csv.as_ref()) {
        csv_records = CsvRecordSink::create(path)?.write_records(&records)?;
        info!(path = %path.display(), records = csv_records, "wrote csv records");
    }
    let mut sqlite_records = 0;
    if let Some(path) = &config.export.sqlite {
        sqlite_records = export_sqlite(path, &config.export.backtest_key, &records)?;
    }

    Ok(ReplayReport {
        manager,
        outcome,
        csv_records,
        sqlite_records,
    })
}

#[cfg(feature = "sqlite")]
fn export_sqlite(
    path: &Path,
    table: &str,
    records: &[crate::domain::event::Record],
) -> Result<usize, LedgerError> {
    use crate::adapters::sqlite_record_adapter::SqliteRecordSink;

    let written = SqliteRecordSink::open(path, table)?.write_records(records)?;
    info!(path = %path.display(), table, records = written, "wrote sqlite records");
    Ok(written)
}

#[cfg(not(feature = "sqlite"))]
fn export_sqlite(
    path: &Path,
    _table: &str,
    _records: &[crate::domain::event::Record],
) -> Result<usize, LedgerError> {
    Err(LedgerError::Export {
        reason: format!(
            "sqlite feature is required to export to {}",
            path.display()
        ),
    })
}

fn run_replay_command(config_path: &Path, options: &ReplayOptions) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let report = run_replay_pipeline(&config, options)?;

    for (name, book) in report.manager.books() {
        eprintln!("{}\n", BookSummary::new(name, book));
    }
    if report.outcome.unresolved > 0 {
        warn!(
            unresolved = report.outcome.unresolved,
            "run finished with outstanding orders"
        );
    }
    eprintln!(
        "Replayed {} signals, {} orders, {} fills.",
        report.outcome.signals, report.outcome.orders, report.outcome.fills
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;

    eprintln!("Policy:     {:?}", config.policy);
    eprintln!("Strategies: {}", config.strategies.join(", "));

    if let Some(path) = &config.replay.events {
        let events = read_event_log(path)?;
        check_event_strategies(&config, &events)?;
        eprintln!("Event log:  {} events in {}", events.len(), path.display());
    }
    if let Some(dir) = &config.replay.bars_dir {
        let instruments = CsvAdapter::new(dir.clone()).list_instruments()?;
        eprintln!("Bars:       {} instruments in {}", instruments.len(), dir.display());
    }

    eprintln!("\nPortfolio configuration is valid.");
    Ok(())
}
