//! Market regime classification from reference index snapshots.
//!
//! Domestic regime, first match wins:
//! 1. volatility index close > 30 → Panic
//! 2. close > MA20 > MA60 → Bull
//! 3. close < MA20 < MA60 → Bear
//! 4. otherwise → Flat
//!
//! Foreign regime: primary foreign index close above its MA20 → Tailwind,
//! else Headwind.
//!
//! Classification is all-or-nothing: any missing series, bar, or moving
//! average yields the Neutral/Neutral pair for the whole run.

use crate::domain::series::{IndexBar, IndexRole, MarketSnapshot};
use chrono::NaiveDate;
use std::fmt;

pub const PANIC_VOLATILITY: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DomesticRegime {
    Bull,
    Bear,
    Panic,
    Flat,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForeignRegime {
    Tailwind,
    Headwind,
    Neutral,
}

impl fmt::Display for DomesticRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomesticRegime::Bull => "Bull",
            DomesticRegime::Bear => "Bear",
            DomesticRegime::Panic => "Panic",
            DomesticRegime::Flat => "Flat",
            DomesticRegime::Neutral => "Neutral",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ForeignRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForeignRegime::Tailwind => "Tailwind",
            ForeignRegime::Headwind => "Headwind",
            ForeignRegime::Neutral => "Neutral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimePair {
    pub domestic: DomesticRegime,
    pub foreign: ForeignRegime,
}

impl Default for RegimePair {
    fn default() -> Self {
        RegimePair {
            domestic: DomesticRegime::Neutral,
            foreign: ForeignRegime::Neutral,
        }
    }
}

impl RegimePair {
    /// Strict mode raises the minimum candidate score.
    pub fn is_strict(&self) -> bool {
        self.foreign == ForeignRegime::Headwind
    }
}

/// Market-environment label stored on positions, e.g. `Bull|Tailwind`.
impl fmt::Display for RegimePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.domestic, self.foreign)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegimeError {
    #[error("missing {0} index series")]
    MissingSeries(IndexRole),

    #[error("no {role} bar on or before {date}")]
    NoBar { role: IndexRole, date: NaiveDate },

    #[error("{role} {field} not available on {date}")]
    MissingAverage {
        role: IndexRole,
        field: &'static str,
        date: NaiveDate,
    },
}

/// Whether the regime came from data or from the fallback default.
#[derive(Debug, Clone, PartialEq)]
pub enum RegimeStatus {
    Classified,
    Fallback(RegimeError),
}

/// Classify the market on `date`, falling back to Neutral/Neutral on any
/// classification error.
pub fn classify(snapshot: &MarketSnapshot, date: NaiveDate) -> (RegimePair, RegimeStatus) {
    match try_classify(snapshot, date) {
        Ok(pair) => {
            log::info!("regime on {date}: {pair}");
            (pair, RegimeStatus::Classified)
        }
        Err(e) => {
            log::warn!("regime classification failed ({e}); using neutral regime");
            (RegimePair::default(), RegimeStatus::Fallback(e))
        }
    }
}

pub fn try_classify(snapshot: &MarketSnapshot, date: NaiveDate) -> Result<RegimePair, RegimeError> {
    let domestic_bar = bar_for(snapshot, IndexRole::Domestic, date)?;
    let resolved = domestic_bar.date;
    let volatility_bar = bar_for(snapshot, IndexRole::Volatility, resolved)?;
    let foreign_bar = bar_for(snapshot, IndexRole::ForeignPrimary, resolved)?;

    let domestic = domestic_regime(
        domestic_bar.close,
        average(domestic_bar, IndexRole::Domestic, "MA20", domestic_bar.ma20)?,
        average(domestic_bar, IndexRole::Domestic, "MA60", domestic_bar.ma60)?,
        volatility_bar.close,
    );
    let foreign = foreign_regime(
        foreign_bar.close,
        average(foreign_bar, IndexRole::ForeignPrimary, "MA20", foreign_bar.ma20)?,
    );

    Ok(RegimePair { domestic, foreign })
}

pub fn domestic_regime(close: f64, ma20: f64, ma60: f64, volatility: f64) -> DomesticRegime {
    if volatility > PANIC_VOLATILITY {
        DomesticRegime::Panic
    } else if close > ma20 && ma20 > ma60 {
        DomesticRegime::Bull
    } else if close < ma20 && ma20 < ma60 {
        DomesticRegime::Bear
    } else {
        DomesticRegime::Flat
    }
}

pub fn foreign_regime(close: f64, ma20: f64) -> ForeignRegime {
    if close > ma20 {
        ForeignRegime::Tailwind
    } else {
        ForeignRegime::Headwind
    }
}

fn bar_for(
    snapshot: &MarketSnapshot,
    role: IndexRole,
    date: NaiveDate,
) -> Result<&IndexBar, RegimeError> {
    snapshot
        .index(role)
        .ok_or(RegimeError::MissingSeries(role))?
        .at_or_before(date)
        .ok_or(RegimeError::NoBar { role, date })
}

fn average(
    bar: &IndexBar,
    role: IndexRole,
    field: &'static str,
    value: Option<f64>,
) -> Result<f64, RegimeError> {
    value.ok_or(RegimeError::MissingAverage {
        role,
        field,
        date: bar.date,
    })
}
