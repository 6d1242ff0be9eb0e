//! Index and symbol time series, and the market snapshot the engine consumes.

use crate::domain::universe::SkippedCode;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Minimum number of valid bars a symbol needs to take part in a run.
pub const MIN_SYMBOL_BARS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBar {
    pub date: NaiveDate,
    pub close: f64,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
}

/// Ordered bars of one reference index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    pub code: String,
    bars: Vec<IndexBar>,
}

impl IndexSeries {
    pub fn new(code: impl Into<String>, mut bars: Vec<IndexBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            code: code.into(),
            bars,
        }
    }

    pub fn bars(&self) -> &[IndexBar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&IndexBar> {
        self.bars.last()
    }

    /// Nearest bar dated on or before `date`.
    pub fn at_or_before(&self, date: NaiveDate) -> Option<&IndexBar> {
        let idx = self.bars.partition_point(|b| b.date <= date);
        idx.checked_sub(1).map(|i| &self.bars[i])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub vol_ma5: Option<f64>,
    pub rsi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("insufficient history: have {bars} bars, need {minimum}")]
    InsufficientBars { bars: usize, minimum: usize },
}

/// Ordered, indicator-augmented bars of one universe symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    pub code: String,
    bars: Vec<SymbolBar>,
}

impl SymbolSeries {
    pub fn new(code: impl Into<String>, mut bars: Vec<SymbolBar>) -> Result<Self, SeriesError> {
        if bars.len() < MIN_SYMBOL_BARS {
            return Err(SeriesError::InsufficientBars {
                bars: bars.len(),
                minimum: MIN_SYMBOL_BARS,
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(Self {
            code: code.into(),
            bars,
        })
    }

    pub fn bars(&self) -> &[SymbolBar] {
        &self.bars
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn latest(&self) -> Option<&SymbolBar> {
        self.bars.last()
    }

    pub fn at_or_before(&self, date: NaiveDate) -> Option<&SymbolBar> {
        let idx = self.bars.partition_point(|b| b.date <= date);
        idx.checked_sub(1).map(|i| &self.bars[i])
    }

    /// The bar dated exactly `date`, if the symbol traded that day.
    pub fn on(&self, date: NaiveDate) -> Option<&SymbolBar> {
        self.at_or_before(date).filter(|b| b.date == date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexRole {
    Domestic,
    Volatility,
    ForeignPrimary,
    ForeignSecondary,
}

impl fmt::Display for IndexRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexRole::Domestic => "domestic",
            IndexRole::Volatility => "volatility",
            IndexRole::ForeignPrimary => "foreign_primary",
            IndexRole::ForeignSecondary => "foreign_secondary",
        };
        f.write_str(name)
    }
}

/// Everything one run reads: reference indices, eligible symbols, and the
/// symbols dropped while assembling them.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub indices: BTreeMap<IndexRole, IndexSeries>,
    pub symbols: BTreeMap<String, SymbolSeries>,
    pub skipped: Vec<SkippedCode>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, role: IndexRole, series: IndexSeries) -> Self {
        self.indices.insert(role, series);
        self
    }

    pub fn with_symbol(mut self, series: SymbolSeries) -> Self {
        self.symbols.insert(series.code.clone(), series);
        self
    }

    pub fn index(&self, role: IndexRole) -> Option<&IndexSeries> {
        self.indices.get(&role)
    }

    /// Date of the latest domestic index bar; the engine's "today".
    pub fn run_date(&self) -> Option<NaiveDate> {
        self.index(IndexRole::Domestic)
            .and_then(IndexSeries::latest)
            .map(|b| b.date)
    }
}
