//! Trading universe and snapshot assembly.
//!
//! Parses code lists from configuration, fetches every reference index and
//! universe symbol through a [`DataPort`], and builds the [`MarketSnapshot`]
//! the engine reads. A defective symbol is skipped on its own; it never
//! fails the run.

use crate::domain::indicator_helpers::{augment_index_bars, augment_symbol_bars};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{IndexRole, IndexSeries, MarketSnapshot, SeriesError, SymbolSeries};
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 120;

/// Default symbol pool: large-cap and momentum names on the Taiwan exchange.
pub const DEFAULT_CODES: &[&str] = &[
    "2330.TW", "2317.TW", "2454.TW", "2382.TW", "2376.TW", "3231.TW", "6669.TW", "3035.TW",
    "3017.TW", "2368.TW", "3037.TW", "2303.TW", "2603.TW", "2609.TW", "2615.TW", "1513.TW",
    "1519.TW", "3711.TW", "6235.TW", "6285.TW", "3661.TW", "3443.TW", "5269.TW", "2356.TW",
    "2357.TW", "3008.TW", "3019.TW", "2421.TW",
];

/// Codes of the reference indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCodes {
    pub domestic: String,
    pub volatility: String,
    pub foreign_primary: String,
    pub foreign_secondary: Option<String>,
}

impl Default for IndexCodes {
    fn default() -> Self {
        IndexCodes {
            domestic: "^TWII".into(),
            volatility: "^VIX".into(),
            foreign_primary: "^IXIC".into(),
            foreign_secondary: Some("^SOX".into()),
        }
    }
}

impl IndexCodes {
    pub fn roles(&self) -> Vec<(IndexRole, &str)> {
        let mut roles = vec![
            (IndexRole::Domestic, self.domestic.as_str()),
            (IndexRole::Volatility, self.volatility.as_str()),
            (IndexRole::ForeignPrimary, self.foreign_primary.as_str()),
        ];
        if let Some(code) = &self.foreign_secondary {
            roles.push((IndexRole::ForeignSecondary, code.as_str()));
        }
        roles
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub codes: Vec<String>,
    pub indices: IndexCodes,
    pub lookback_days: i64,
}

impl Default for Universe {
    fn default() -> Self {
        Universe {
            codes: DEFAULT_CODES.iter().map(|c| c.to_string()).collect(),
            indices: IndexCodes::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }

    /// First calendar day of the fetch window ending at `as_of`.
    pub fn window_start(&self, as_of: NaiveDate) -> NaiveDate {
        as_of - Duration::days(self.lookback_days)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
    MalformedBar(String),
    InsufficientBars { bars: usize },
    MissingIndicator(&'static str),
    NoBarForDate(NaiveDate),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(e) => write!(f, "fetch failed: {e}"),
            SkipReason::NoData => f.write_str("no data found"),
            SkipReason::MalformedBar(defect) => write!(f, "malformed bar: {defect}"),
            SkipReason::InsufficientBars { bars } => write!(f, "only {bars} bars"),
            SkipReason::MissingIndicator(name) => write!(f, "{name} unavailable"),
            SkipReason::NoBarForDate(date) => write!(f, "no bar on or before {date}"),
        }
    }
}

fn fetch_clean(
    data_port: &dyn DataPort,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<OhlcvBar>, SkipReason> {
    let mut bars = data_port
        .fetch_ohlcv(code, start, end)
        .map_err(|e| SkipReason::FetchFailed(e.to_string()))?;
    if bars.is_empty() {
        return Err(SkipReason::NoData);
    }
    if let Some(defect) = bars.iter().find_map(OhlcvBar::defect) {
        return Err(SkipReason::MalformedBar(defect));
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn load_symbol(
    data_port: &dyn DataPort,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SymbolSeries, SkipReason> {
    let bars = fetch_clean(data_port, code, start, end)?;
    SymbolSeries::new(code, augment_symbol_bars(&bars)).map_err(|e| match e {
        SeriesError::InsufficientBars { bars, .. } => SkipReason::InsufficientBars { bars },
    })
}

/// Fetch indices and symbols for the window ending at `as_of`.
///
/// Missing indices are left out of the snapshot; the engine treats a missing
/// domestic index as a no-data day and any other gap as a classification
/// fallback.
pub fn build_snapshot(
    data_port: &dyn DataPort,
    universe: &Universe,
    as_of: NaiveDate,
) -> MarketSnapshot {
    let start = universe.window_start(as_of);
    let mut snapshot = MarketSnapshot::new();

    for (role, code) in universe.indices.roles() {
        match fetch_clean(data_port, code, start, as_of) {
            Ok(bars) => {
                log::debug!("{} index {}: {} bars", role, code, bars.len());
                snapshot
                    .indices
                    .insert(role, IndexSeries::new(code, augment_index_bars(&bars)));
            }
            Err(reason) => log::warn!("{} index {} unavailable ({})", role, code, reason),
        }
    }

    for code in &universe.codes {
        match load_symbol(data_port, code, start, as_of) {
            Ok(series) => {
                log::debug!("{}: {} bars [OK]", code, series.bar_count());
                snapshot.symbols.insert(code.clone(), series);
            }
            Err(reason) => {
                log::warn!("skipping {} ({})", code, reason);
                snapshot.skipped.push(SkippedCode {
                    code: code.clone(),
                    reason,
                });
            }
        }
    }

    log::info!(
        "snapshot for {}: {} of {} symbols eligible",
        as_of,
        snapshot.symbols.len(),
        universe.count()
    );
    snapshot
}
