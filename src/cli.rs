//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::cost::CostModel;
use crate::domain::engine::{DayOutcome, DayReport, DayResult, DecisionEngine, EngineConfig};
use crate::domain::error::LionError;
use crate::domain::ledger::PositionLedger;
use crate::domain::metrics::{AccountSummary, StrategyResult};
use crate::domain::position::Position;
use crate::domain::regime::RegimeStatus;
use crate::domain::series::MarketSnapshot;
use crate::domain::universe::{
    build_snapshot, parse_codes, IndexCodes, Universe, DEFAULT_LOOKBACK_DAYS,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;

pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_LEDGER_PATH: &str = "Lion_Ledger.csv";

#[derive(Parser, Debug)]
#[command(
    name = "liontrader",
    about = "Daily rule-based stock screening with a paper-trading ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daily decision engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of per-code CSV files (overrides [data] path)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Ledger CSV file (overrides [ledger] path)
        #[arg(short, long)]
        ledger: Option<PathBuf>,
        /// Run date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Evaluate and report without saving the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the account summary and open positions
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ledger: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            data,
            ledger,
            as_of,
            dry_run,
        } => run_daily(&config, data, ledger, as_of, dry_run),
        Command::Summary { config, ledger } => run_summary(&config, ledger),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LionError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_engine_config(adapter: &dyn ConfigPort) -> EngineConfig {
    let defaults = EngineConfig::default();
    let costs = CostModel::default();

    EngineConfig {
        initial_capital: adapter.get_double("account", "initial_capital", defaults.initial_capital),
        goal_profit: adapter.get_double("account", "goal_profit", defaults.goal_profit),
        budget_per_symbol: adapter.get_double(
            "allocation",
            "budget_per_symbol",
            defaults.budget_per_symbol,
        ),
        max_daily_positions: adapter.get_int(
            "allocation",
            "max_daily_positions",
            defaults.max_daily_positions as i64,
        )
        .max(1) as usize,
        target_pct: adapter.get_double("allocation", "target_pct", defaults.target_pct),
        stop_loss_pct: adapter.get_double("allocation", "stop_loss_pct", defaults.stop_loss_pct),
        costs: CostModel {
            fee_rate: adapter.get_double("costs", "fee_rate", costs.fee_rate),
            fee_discount: adapter.get_double("costs", "fee_discount", costs.fee_discount),
            tax_rate: adapter.get_double("costs", "tax_rate", costs.tax_rate),
            min_fee: adapter.get_int("costs", "min_fee", costs.min_fee),
        },
    }
}

pub fn build_universe(adapter: &dyn ConfigPort) -> Result<Universe, LionError> {
    let defaults = Universe::default();

    let codes = match adapter.get_string("universe", "codes") {
        Some(list) => parse_codes(&list).map_err(|e| LionError::ConfigInvalid {
            section: "universe".into(),
            key: "codes".into(),
            reason: e.to_string(),
        })?,
        None => defaults.codes,
    };

    let index_defaults = IndexCodes::default();
    let index = |key: &str, default: String| {
        adapter
            .get_string("indices", key)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
    };
    let foreign_secondary = match adapter.get_string("indices", "foreign_secondary") {
        Some(code) if code.is_empty() => None,
        Some(code) => Some(code),
        None => index_defaults.foreign_secondary,
    };

    Ok(Universe {
        codes,
        indices: IndexCodes {
            domestic: index("domestic", index_defaults.domestic),
            volatility: index("volatility", index_defaults.volatility),
            foreign_primary: index("foreign_primary", index_defaults.foreign_primary),
            foreign_secondary,
        },
        lookback_days: adapter.get_int("data", "lookback_days", DEFAULT_LOOKBACK_DAYS),
    })
}

/// Command-line override, else the configured path, else `default`.
pub fn resolve_path(
    override_path: Option<PathBuf>,
    config: &dyn ConfigPort,
    section: &str,
    default: &str,
) -> PathBuf {
    override_path
        .or_else(|| config.get_string(section, "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Load the ledger, run one day, and persist the result unless `dry_run`.
///
/// A no-signal day never writes the ledger.
pub fn run_daily_pipeline(
    data_port: &dyn DataPort,
    ledger_port: &dyn LedgerPort,
    config: &EngineConfig,
    universe: &Universe,
    as_of: NaiveDate,
    dry_run: bool,
) -> Result<(DayResult, MarketSnapshot), LionError> {
    let ledger = ledger_port.load()?;
    eprintln!(
        "Ledger: {} positions ({} open)",
        ledger.len(),
        ledger.open_count()
    );

    eprintln!(
        "Fetching {} codes and {} indices up to {}...",
        universe.count(),
        universe.indices.roles().len(),
        as_of
    );
    let snapshot = build_snapshot(data_port, universe, as_of);

    let engine = DecisionEngine::new(config.clone());
    let result = engine.run(ledger, &snapshot);

    match &result.outcome {
        DayOutcome::Traded(_) if dry_run => eprintln!("Dry run: ledger not saved"),
        DayOutcome::Traded(_) => ledger_port.save(&result.ledger)?,
        DayOutcome::NoSignal { .. } => {}
    }

    Ok((result, snapshot))
}

fn run_daily(
    config_path: &Path,
    data: Option<PathBuf>,
    ledger: Option<PathBuf>,
    as_of: Option<NaiveDate>,
    dry_run: bool,
) -> Result<(), LionError> {
    let adapter = load_config(config_path)?;
    let config = build_engine_config(&adapter);
    let universe = build_universe(&adapter)?;

    let data_port = CsvAdapter::new(resolve_path(data, &adapter, "data", DEFAULT_DATA_PATH));
    let ledger_port =
        CsvLedgerAdapter::new(resolve_path(ledger, &adapter, "ledger", DEFAULT_LEDGER_PATH));
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    let (result, snapshot) =
        run_daily_pipeline(&data_port, &ledger_port, &config, &universe, as_of, dry_run)?;

    match &result.outcome {
        DayOutcome::NoSignal { reason } => println!("No signal for {as_of}: {reason}"),
        DayOutcome::Traded(report) => {
            print!("{}", render_index_closes(&snapshot, report.run_date));
            print!("{}", render_day_report(report));
        }
    }

    let summary = AccountSummary::compute(&result.ledger, config.initial_capital, config.goal_profit);
    print!("{}", render_account_summary(&summary));
    print!(
        "{}",
        render_strategy_table(&StrategyResult::compute_per_strategy(
            result.ledger.closed_positions()
        ))
    );
    Ok(())
}

fn run_summary(config_path: &Path, ledger: Option<PathBuf>) -> Result<(), LionError> {
    let adapter = load_config(config_path)?;
    let config = build_engine_config(&adapter);
    let ledger_port =
        CsvLedgerAdapter::new(resolve_path(ledger, &adapter, "ledger", DEFAULT_LEDGER_PATH));

    let ledger = ledger_port.load()?;
    let summary = AccountSummary::compute(&ledger, config.initial_capital, config.goal_profit);

    print!("{}", render_account_summary(&summary));
    print!("{}", render_open_positions(&ledger, Local::now().date_naive()));
    print!(
        "{}",
        render_strategy_table(&StrategyResult::compute_per_strategy(
            ledger.closed_positions()
        ))
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), LionError> {
    let adapter = load_config(config_path)?;
    let config = build_engine_config(&adapter);
    let universe = build_universe(&adapter)?;

    eprintln!("Configuration OK");
    eprintln!(
        "  Capital:   {:.0} (goal +{:.0})",
        config.initial_capital, config.goal_profit
    );
    eprintln!(
        "  Budget:    {:.0} per symbol, at most {} open",
        config.budget_per_symbol, config.max_daily_positions
    );
    eprintln!(
        "  Exits:     target +{:.1}%, stop -{:.1}%",
        config.target_pct * 100.0,
        config.stop_loss_pct * 100.0
    );
    eprintln!(
        "  Universe:  {} codes, {} days lookback",
        universe.count(),
        universe.lookback_days
    );
    Ok(())
}

fn signed(value: i64) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

pub fn render_index_closes(snapshot: &MarketSnapshot, run_date: NaiveDate) -> String {
    let closes: Vec<String> = snapshot
        .indices
        .iter()
        .filter_map(|(role, series)| {
            series
                .at_or_before(run_date)
                .map(|bar| format!("{} {} {:.2}", role, series.code, bar.close))
        })
        .collect();
    if closes.is_empty() {
        return String::new();
    }
    format!("Indices:  {}\n", closes.join(" | "))
}

pub fn render_day_report(report: &DayReport) -> String {
    let mut output = format!("\n=== Daily Run {} ===\n", report.run_date);
    output.push_str(&format!(
        "Regime:   {} / {}\n",
        report.regime.domestic, report.regime.foreign
    ));
    if let RegimeStatus::Fallback(reason) = &report.regime_status {
        output.push_str(&format!("          (neutral fallback: {reason})\n"));
    }
    output.push_str(&format!(
        "Strict:   {}\n",
        if report.strict { "yes (score >= 5 only)" } else { "no" }
    ));

    output.push_str(&format!("\nClosed ({}):\n", report.closed.len()));
    for pos in &report.closed {
        if let Some(exit) = &pos.exit {
            output.push_str(&format!(
                "  {:<10} {:<12} @ {:>9.2}  P&L {} ({:.2}%)\n",
                pos.symbol,
                exit.reason.as_str(),
                exit.exit_price,
                signed(exit.net_pnl),
                exit.roi_pct
            ));
        }
    }

    output.push_str(&format!("\nOpened ({}):\n", report.opened.len()));
    for pos in &report.opened {
        output.push_str(&format!(
            "  {:<10} {:<20} {:>6} @ {:>9.2}  stop {:.2}  target {:.2}\n",
            pos.symbol,
            pos.strategy.as_str(),
            pos.shares,
            pos.entry_price,
            pos.stop_price,
            pos.target_price
        ));
    }

    if !report.rejected.is_empty() {
        output.push_str(&format!("\nRejected ({}):\n", report.rejected.len()));
        for r in &report.rejected {
            output.push_str(&format!("  {:<10} {}\n", r.symbol, r.reason));
        }
    }

    if !report.skipped.is_empty() {
        output.push_str(&format!("\nSkipped ({}):\n", report.skipped.len()));
        for s in &report.skipped {
            output.push_str(&format!("  {:<10} {}\n", s.code, s.reason));
        }
    }

    output
}

pub fn render_account_summary(summary: &AccountSummary) -> String {
    let mut output = String::from("\n=== Account ===\n");
    output.push_str(&format!("Initial capital:  {:.0}\n", summary.initial_capital));
    output.push_str(&format!("Net profit:       {}\n", signed(summary.net_profit)));
    output.push_str(&format!("Equity:           {:.0}\n", summary.equity));
    output.push_str(&format!("Invested:         {}\n", summary.invested));
    output.push_str(&format!("Remaining cash:   {:.0}\n", summary.remaining));
    output.push_str(&format!(
        "Goal progress:    {:.1}% of {:.0}\n",
        summary.progress_pct, summary.goal_profit
    ));
    output.push_str(&format!(
        "Positions:        {} open, {} closed\n",
        summary.open_positions, summary.closed_positions
    ));
    output
}

pub fn render_open_positions(ledger: &PositionLedger, as_of: NaiveDate) -> String {
    let open: Vec<&Position> = ledger.open_positions().collect();
    let mut output = format!("\n=== Open Positions ({}) ===\n", open.len());
    for pos in open {
        output.push_str(&format!(
            "  {:<10} {:<20} since {} ({}d)  {} @ {:.2}  stop {:.2}  target {:.2}\n",
            pos.symbol,
            pos.strategy.as_str(),
            pos.entry_date,
            pos.holding_days(as_of),
            pos.shares,
            pos.entry_price,
            pos.stop_price,
            pos.target_price
        ));
    }
    output
}

pub fn render_strategy_table(results: &[StrategyResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut output = String::from("\n=== Per-Strategy Summary ===\n");
    for r in results {
        output.push_str(&format!(
            "  {:<20} {} trades, {:.1}% win rate, total {}, avg {:.0}\n",
            r.strategy.as_str(),
            r.trades,
            r.win_rate * 100.0,
            signed(r.total_pnl),
            r.avg_pnl
        ));
    }
    output
}
