//! Account figures and per-strategy statistics over the ledger.

use crate::domain::ledger::PositionLedger;
use crate::domain::position::{Position, StrategyLabel};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub initial_capital: f64,
    pub goal_profit: f64,
    /// Sum of realized P&L over closed positions.
    pub net_profit: i64,
    /// Sum of total cost over open positions.
    pub invested: i64,
    pub equity: f64,
    /// Cash not tied up in open positions.
    pub remaining: f64,
    /// Progress toward the profit goal, clamped to 0..=100.
    pub progress_pct: f64,
    pub open_positions: usize,
    pub closed_positions: usize,
}

impl AccountSummary {
    pub fn compute(ledger: &PositionLedger, initial_capital: f64, goal_profit: f64) -> Self {
        let net_profit: i64 = ledger.closed_positions().filter_map(Position::net_pnl).sum();
        let invested: i64 = ledger.open_positions().map(|p| p.total_cost).sum();

        let equity = initial_capital + net_profit as f64;
        let progress_pct = if goal_profit > 0.0 {
            (net_profit as f64 / goal_profit * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        AccountSummary {
            initial_capital,
            goal_profit,
            net_profit,
            invested,
            equity,
            remaining: equity - invested as f64,
            progress_pct,
            open_positions: ledger.open_count(),
            closed_positions: ledger.len() - ledger.open_count(),
        }
    }
}

/// Closed-trade statistics for one strategy label.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy: StrategyLabel,
    pub trades: usize,
    pub wins: usize,
    pub total_pnl: i64,
    pub avg_pnl: f64,
    pub win_rate: f64,
    pub largest_win: i64,
    pub largest_loss: i64,
}

impl StrategyResult {
    /// One row per label that has at least one closed trade, sorted by label
    /// text. Open positions in `closed` are ignored.
    pub fn compute_per_strategy<'a, I>(closed: I) -> Vec<StrategyResult>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        let mut by_label: BTreeMap<StrategyLabel, Vec<i64>> = BTreeMap::new();
        for pos in closed {
            if let Some(pnl) = pos.net_pnl() {
                by_label.entry(pos.strategy).or_default().push(pnl);
            }
        }

        let mut results: Vec<StrategyResult> = by_label
            .into_iter()
            .map(|(strategy, pnls)| {
                let trades = pnls.len();
                let wins = pnls.iter().filter(|&&p| p > 0).count();
                let total_pnl: i64 = pnls.iter().sum();
                StrategyResult {
                    strategy,
                    trades,
                    wins,
                    total_pnl,
                    avg_pnl: total_pnl as f64 / trades as f64,
                    win_rate: wins as f64 / trades as f64,
                    largest_win: pnls.iter().copied().filter(|p| *p > 0).max().unwrap_or(0),
                    largest_loss: pnls.iter().copied().filter(|p| *p < 0).min().unwrap_or(0),
                }
            })
            .collect();

        results.sort_by_key(|r| r.strategy.as_str());
        results
    }
}
