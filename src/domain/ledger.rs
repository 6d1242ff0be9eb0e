//! The position ledger: every paper trade, open and closed.

use crate::domain::cost::CostModel;
use crate::domain::position::{ExitReason, Position};
use crate::domain::series::SymbolBar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("duplicate trade id {0}")]
    DuplicateId(String),

    #[error("more than one open position for {0}")]
    DuplicateOpen(String),

    #[error("trade {0} has a non-positive share count")]
    InvalidShares(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionLedger {
    positions: Vec<Position>,
}

/// Which exit rule, if any, fires for `position` on `bar`.
///
/// Priority: stop-loss, then take-profit, then trend-break (Trend Check
/// entries only). The first match wins.
pub fn exit_decision(position: &Position, bar: &SymbolBar) -> Option<(ExitReason, f64)> {
    if position.should_stop_loss(bar.low) {
        return Some((ExitReason::StopLoss, position.stop_price));
    }
    if position.should_take_profit(bar.high) {
        return Some((ExitReason::TakeProfit, position.target_price));
    }
    if position.strategy.exits_on_trend_break() {
        if let Some(ma20) = bar.ma20 {
            if bar.close < ma20 {
                return Some((ExitReason::TrendBreak, bar.close));
            }
        }
    }
    None
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from persisted records, rejecting any record set that
    /// breaks the ledger invariants.
    pub fn from_positions(positions: Vec<Position>) -> Result<Self, LedgerError> {
        let mut ids = HashSet::new();
        let mut open_symbols = HashSet::new();

        for pos in &positions {
            if pos.shares <= 0 {
                return Err(LedgerError::InvalidShares(pos.id.clone()));
            }
            if !ids.insert(pos.id.as_str()) {
                return Err(LedgerError::DuplicateId(pos.id.clone()));
            }
            if pos.is_open() && !open_symbols.insert(pos.symbol.as_str()) {
                return Err(LedgerError::DuplicateOpen(pos.symbol.clone()));
            }
        }

        Ok(Self { positions })
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn closed_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| !p.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_positions().count()
    }

    pub fn has_open(&self, symbol: &str) -> bool {
        self.open_positions().any(|p| p.symbol == symbol)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.positions.iter().any(|p| p.id == id)
    }

    /// Add a new open position.
    ///
    /// The caller is responsible for checking that `symbol` is not already
    /// held; allocation does this before every append.
    pub fn append(&mut self, position: Position) {
        debug_assert!(position.is_open(), "only open positions can be appended");
        debug_assert!(
            !self.has_open(&position.symbol),
            "{} already has an open position",
            position.symbol
        );
        self.positions.push(position);
    }

    /// Apply exit rules to every open position that has a bar today.
    ///
    /// Returns copies of the positions closed by this call. Open positions
    /// without a bar dated `today`, or whose bar is not later than the entry
    /// date, are left untouched.
    pub fn evaluate_exits(
        &mut self,
        today_bars: &BTreeMap<String, SymbolBar>,
        today: NaiveDate,
        costs: &CostModel,
    ) -> Vec<Position> {
        let mut closed = Vec::new();

        for pos in self.positions.iter_mut().filter(|p| p.is_open()) {
            let Some(bar) = today_bars.get(&pos.symbol).filter(|b| b.date == today) else {
                log::debug!("no bar today for held {}; leaving open", pos.symbol);
                continue;
            };
            if bar.date <= pos.entry_date {
                continue;
            }

            if let Some((reason, price)) = exit_decision(pos, bar) {
                pos.close(today, price, reason, costs);
                log::info!(
                    "closed {} ({}) at {:.2}: pnl {}",
                    pos.symbol,
                    reason,
                    price,
                    pos.net_pnl().unwrap_or_default()
                );
                closed.push(pos.clone());
            }
        }

        closed
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }
}
