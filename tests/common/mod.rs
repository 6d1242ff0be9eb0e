#![allow(dead_code)]

use chrono::NaiveDate;
use liontrader::domain::error::LionError;
use liontrader::domain::ledger::PositionLedger;
pub use liontrader::domain::ohlcv::OhlcvBar;
use liontrader::domain::universe::{IndexCodes, Universe};
use liontrader::ports::data_port::DataPort;
use liontrader::ports::ledger_port::LedgerPort;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn without(mut self, code: &str) -> Self {
        self.data.remove(code);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, LionError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(LionError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(code).ok_or_else(|| LionError::NoData {
            code: code.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .cloned()
            .collect())
    }
}

/// In-memory ledger store that counts saves.
pub struct MemoryLedgerPort {
    pub ledger: RefCell<PositionLedger>,
    pub saves: Cell<usize>,
}

impl MemoryLedgerPort {
    pub fn new() -> Self {
        Self {
            ledger: RefCell::new(PositionLedger::new()),
            saves: Cell::new(0),
        }
    }

    pub fn current(&self) -> PositionLedger {
        self.ledger.borrow().clone()
    }
}

impl LedgerPort for MemoryLedgerPort {
    fn load(&self) -> Result<PositionLedger, LionError> {
        Ok(self.ledger.borrow().clone())
    }

    fn save(&self, ledger: &PositionLedger) -> Result<(), LionError> {
        *self.ledger.borrow_mut() = ledger.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Run date used across the integration tests.
pub fn run_day() -> NaiveDate {
    date(2024, 6, 28)
}

/// `count` daily bars ending on `end`, close moving by `step` per day.
pub fn linear_bars(code: &str, end: NaiveDate, count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    let start = end - chrono::Duration::days(count as i64 - 1);
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            OhlcvBar {
                code: code.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000,
            }
        })
        .collect()
}

pub fn set_volume(bars: &mut [OhlcvBar], on: NaiveDate, volume: i64) {
    if let Some(bar) = bars.iter_mut().find(|b| b.date == on) {
        bar.volume = volume;
    }
}

/// Append one bar the day after the last.
pub fn push_bar(bars: &mut Vec<OhlcvBar>, low: f64, high: f64, close: f64) {
    let last = bars.last().unwrap();
    let next = OhlcvBar {
        code: last.code.clone(),
        date: last.date + chrono::Duration::days(1),
        open: close,
        high,
        low,
        close,
        volume: 1000,
    };
    bars.push(next);
}

/// Rising domestic and foreign indices with calm volatility, through `end`.
pub fn bull_indices(port: MockDataPort, end: NaiveDate) -> MockDataPort {
    port.with_bars("^TWII", linear_bars("^TWII", end, 100, 17_000.0, 20.0))
        .with_bars("^VIX", linear_bars("^VIX", end, 100, 15.0, 0.0))
        .with_bars("^IXIC", linear_bars("^IXIC", end, 100, 15_000.0, 10.0))
        .with_bars("^SOX", linear_bars("^SOX", end, 100, 4_000.0, 5.0))
}

pub fn universe(codes: &[&str]) -> Universe {
    Universe {
        codes: codes.iter().map(|c| c.to_string()).collect(),
        indices: IndexCodes::default(),
        lookback_days: 120,
    }
}

pub fn write_csv(dir: &Path, code: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        writeln!(
            content,
            "{},{},{},{},{},{}",
            b.date, b.open, b.high, b.low, b.close, b.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
