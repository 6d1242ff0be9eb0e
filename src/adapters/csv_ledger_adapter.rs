//! CSV ledger persistence.
//!
//! One row per position under a fixed header. Exit columns are empty while a
//! position is open. Floats are written in shortest round-trip form so a
//! save/load cycle reproduces every value exactly.

use crate::domain::error::LionError;
use crate::domain::ledger::{LedgerError, PositionLedger};
use crate::domain::position::{ExitFacet, Position, PositionStatus};
use crate::ports::ledger_port::LedgerPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const LEDGER_HEADER: [&str; 20] = [
    "trade_id",
    "entry_date",
    "symbol",
    "entry_price",
    "shares",
    "entry_fee",
    "total_cost",
    "stop_price",
    "target_price",
    "status",
    "strategy",
    "market_env",
    "exit_date",
    "exit_price",
    "exit_fee",
    "exit_tax",
    "revenue",
    "net_pnl",
    "roi_pct",
    "exit_reason",
];

const EXIT_COLUMNS: std::ops::Range<usize> = 12..20;
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvLedgerAdapter {
    path: PathBuf,
}

impl CsvLedgerAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn corrupt(line: u64, reason: impl Into<String>) -> LionError {
    LionError::LedgerCorrupt {
        line,
        reason: reason.into(),
    }
}

/// I/O failures stay I/O errors; anything else is a malformed file.
fn read_error(line: u64, err: csv::Error) -> LionError {
    if err.is_io_error() {
        LionError::Io(err.into())
    } else {
        corrupt(line, err.to_string())
    }
}

/// Row-level reader that tags every failure with its line number.
struct Row<'a> {
    record: &'a csv::StringRecord,
    line: u64,
}

impl Row<'_> {
    fn raw(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("").trim()
    }

    fn parse<T>(&self, idx: usize) -> Result<T, LionError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.raw(idx);
        raw.parse().map_err(|e| {
            corrupt(
                self.line,
                format!("invalid {} value '{}': {}", LEDGER_HEADER[idx], raw, e),
            )
        })
    }

    fn price(&self, idx: usize) -> Result<f64, LionError> {
        let value: f64 = self.parse(idx)?;
        if !value.is_finite() || value <= 0.0 {
            return Err(corrupt(
                self.line,
                format!(
                    "{} must be a positive number, got '{}'",
                    LEDGER_HEADER[idx],
                    self.raw(idx)
                ),
            ));
        }
        Ok(value)
    }

    fn date(&self, idx: usize) -> Result<NaiveDate, LionError> {
        let raw = self.raw(idx);
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
            corrupt(
                self.line,
                format!("invalid {} '{}': {}", LEDGER_HEADER[idx], raw, e),
            )
        })
    }

    fn text(&self, idx: usize) -> Result<String, LionError> {
        match self.raw(idx) {
            "" => Err(corrupt(
                self.line,
                format!("{} is empty", LEDGER_HEADER[idx]),
            )),
            s => Ok(s.to_string()),
        }
    }

    fn exit_facet(&self, status: PositionStatus) -> Result<Option<ExitFacet>, LionError> {
        let filled = EXIT_COLUMNS.filter(|&i| !self.raw(i).is_empty()).count();
        match status {
            PositionStatus::Open if filled == 0 => Ok(None),
            PositionStatus::Open => Err(corrupt(self.line, "open position has exit fields")),
            PositionStatus::Closed if filled == EXIT_COLUMNS.len() => Ok(Some(ExitFacet {
                exit_date: self.date(12)?,
                exit_price: self.price(13)?,
                exit_fee: self.parse(14)?,
                exit_tax: self.parse(15)?,
                revenue: self.parse(16)?,
                net_pnl: self.parse(17)?,
                roi_pct: self.parse(18)?,
                reason: self.parse(19)?,
            })),
            PositionStatus::Closed => {
                Err(corrupt(self.line, "closed position is missing exit fields"))
            }
        }
    }

    fn position(&self) -> Result<Position, LionError> {
        if self.record.len() != LEDGER_HEADER.len() {
            return Err(corrupt(
                self.line,
                format!(
                    "expected {} fields, found {}",
                    LEDGER_HEADER.len(),
                    self.record.len()
                ),
            ));
        }

        let shares: i64 = self.parse(4)?;
        if shares <= 0 {
            return Err(corrupt(self.line, "shares must be positive"));
        }
        let status: PositionStatus = self.parse(9)?;

        Ok(Position {
            id: self.text(0)?,
            entry_date: self.date(1)?,
            symbol: self.text(2)?,
            entry_price: self.price(3)?,
            shares,
            entry_fee: self.parse(5)?,
            total_cost: self.parse(6)?,
            stop_price: self.price(7)?,
            target_price: self.price(8)?,
            strategy: self.parse(10)?,
            market_env: self.text(11)?,
            exit: self.exit_facet(status)?,
        })
    }
}

fn to_record(pos: &Position) -> Vec<String> {
    let mut row = vec![
        pos.id.clone(),
        pos.entry_date.format(DATE_FORMAT).to_string(),
        pos.symbol.clone(),
        pos.entry_price.to_string(),
        pos.shares.to_string(),
        pos.entry_fee.to_string(),
        pos.total_cost.to_string(),
        pos.stop_price.to_string(),
        pos.target_price.to_string(),
        pos.status().to_string(),
        pos.strategy.to_string(),
        pos.market_env.clone(),
    ];
    match &pos.exit {
        Some(exit) => row.extend([
            exit.exit_date.format(DATE_FORMAT).to_string(),
            exit.exit_price.to_string(),
            exit.exit_fee.to_string(),
            exit.exit_tax.to_string(),
            exit.revenue.to_string(),
            exit.net_pnl.to_string(),
            exit.roi_pct.to_string(),
            exit.reason.to_string(),
        ]),
        None => row.extend(EXIT_COLUMNS.map(|_| String::new())),
    }
    row
}

/// Line of the record that made `err` fire: the last record it names.
fn offending_line(rows: &[(u64, Position)], err: &LedgerError) -> u64 {
    let hit = |pos: &Position| match err {
        LedgerError::DuplicateId(id) | LedgerError::InvalidShares(id) => &pos.id == id,
        LedgerError::DuplicateOpen(symbol) => pos.is_open() && &pos.symbol == symbol,
    };
    rows.iter()
        .rev()
        .find(|(_, pos)| hit(pos))
        .map_or(0, |(line, _)| *line)
}

impl LedgerPort for CsvLedgerAdapter {
    fn load(&self) -> Result<PositionLedger, LionError> {
        if !self.path.exists() {
            log::info!("no ledger at {}; starting empty", self.path.display());
            return Ok(PositionLedger::new());
        }

        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| read_error(0, e))?;

        let headers = rdr.headers().map_err(|e| read_error(1, e))?;
        if headers.iter().map(str::trim).ne(LEDGER_HEADER.iter().copied()) {
            return Err(corrupt(1, "unexpected header"));
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                read_error(line, e)
            })?;
            let line = record.position().map_or(0, |p| p.line());
            let position = Row {
                record: &record,
                line,
            }
            .position()?;
            rows.push((line, position));
        }

        let positions = rows.iter().map(|(_, p)| p.clone()).collect();
        let ledger = PositionLedger::from_positions(positions)
            .map_err(|e| corrupt(offending_line(&rows, &e), e.to_string()))?;
        log::debug!(
            "loaded {} positions ({} open) from {}",
            ledger.len(),
            ledger.open_count(),
            self.path.display()
        );
        Ok(ledger)
    }

    fn save(&self, ledger: &PositionLedger) -> Result<(), LionError> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| LionError::Io(e.into()))?;
            wtr.write_record(LEDGER_HEADER)
                .map_err(|e| LionError::Io(e.into()))?;
            for pos in ledger.iter() {
                wtr.write_record(to_record(pos))
                    .map_err(|e| LionError::Io(e.into()))?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        log::info!("saved {} positions to {}", ledger.len(), self.path.display());
        Ok(())
    }
}
