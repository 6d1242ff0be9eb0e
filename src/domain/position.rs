//! Paper positions and their Open → Closed lifecycle.

use crate::domain::cost::CostModel;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Round to two decimal places, the precision prices are recorded at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyLabel {
    InstitutionalFlow,
    TrendCheck,
    DipBuy,
}

impl StrategyLabel {
    /// Only trend-following entries are exited when the close breaks MA20.
    pub fn exits_on_trend_break(&self) -> bool {
        matches!(self, StrategyLabel::TrendCheck)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyLabel::InstitutionalFlow => "Institutional Flow",
            StrategyLabel::TrendCheck => "Trend Check",
            StrategyLabel::DipBuy => "Bear-Market Dip Buy",
        }
    }
}

impl fmt::Display for StrategyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            StrategyLabel::InstitutionalFlow,
            StrategyLabel::TrendCheck,
            StrategyLabel::DipBuy,
        ]
        .into_iter()
        .find(|label| label.as_str() == s)
        .ok_or_else(|| format!("unknown strategy label '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrendBreak,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TakeProfit => "take-profit",
            ExitReason::TrendBreak => "trend-break",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop-loss" => Ok(ExitReason::StopLoss),
            "take-profit" => Ok(ExitReason::TakeProfit),
            "trend-break" => Ok(ExitReason::TrendBreak),
            other => Err(format!("unknown exit reason '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "Open",
            PositionStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(PositionStatus::Open),
            "Closed" => Ok(PositionStatus::Closed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Fields that only exist once a position has been closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitFacet {
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_fee: i64,
    pub exit_tax: i64,
    pub revenue: f64,
    pub net_pnl: i64,
    pub roi_pct: f64,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: i64,
    pub entry_fee: i64,
    pub total_cost: i64,
    pub stop_price: f64,
    pub target_price: f64,
    pub strategy: StrategyLabel,
    pub market_env: String,
    pub exit: Option<ExitFacet>,
}

/// Entry parameters decided by allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
    pub shares: i64,
    pub stop_price: f64,
    pub target_price: f64,
    pub strategy: StrategyLabel,
    pub market_env: String,
}

impl Position {
    pub fn trade_id(entry_date: NaiveDate, symbol: &str) -> String {
        format!("{}_{}", entry_date.format("%Y-%m-%d"), symbol)
    }

    /// Open a position, charging the buy-side fee.
    ///
    /// total_cost = trunc(shares * price + entry_fee).
    ///
    /// # Panics
    ///
    /// If `entry.shares` is not positive.
    pub fn open(entry: Entry, costs: &CostModel) -> Self {
        assert!(entry.shares > 0, "share count must be positive");

        let notional = entry.shares as f64 * entry.price;
        let entry_fee = costs.fee(notional, false).fee;
        let total_cost = (notional + entry_fee as f64) as i64;

        Position {
            id: Self::trade_id(entry.date, &entry.symbol),
            symbol: entry.symbol,
            entry_date: entry.date,
            entry_price: entry.price,
            shares: entry.shares,
            entry_fee,
            total_cost,
            stop_price: round2(entry.stop_price),
            target_price: round2(entry.target_price),
            strategy: entry.strategy,
            market_env: entry.market_env,
            exit: None,
        }
    }

    pub fn status(&self) -> PositionStatus {
        if self.exit.is_some() {
            PositionStatus::Closed
        } else {
            PositionStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit.is_none()
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_price
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.target_price
    }

    /// Close the position at `price`, charging sell-side fee and tax.
    ///
    /// # Panics
    ///
    /// If the position is already closed.
    pub fn close(&mut self, date: NaiveDate, price: f64, reason: ExitReason, costs: &CostModel) {
        assert!(self.is_open(), "position {} is already closed", self.id);

        let exit_price = round2(price);
        let revenue = exit_price * self.shares as f64;
        let cost = costs.fee(revenue, true);
        let net_pnl = (revenue - cost.fee as f64 - cost.tax as f64 - self.total_cost as f64) as i64;
        let roi_pct = if self.total_cost > 0 {
            round2(net_pnl as f64 / self.total_cost as f64 * 100.0)
        } else {
            0.0
        };

        self.exit = Some(ExitFacet {
            exit_date: date,
            exit_price,
            exit_fee: cost.fee,
            exit_tax: cost.tax,
            revenue,
            net_pnl,
            roi_pct,
            reason,
        });
    }

    pub fn net_pnl(&self) -> Option<i64> {
        self.exit.as_ref().map(|e| e.net_pnl)
    }

    /// Calendar days held: up to the exit date when closed, else up to `as_of`.
    pub fn holding_days(&self, as_of: NaiveDate) -> i64 {
        let end = self.exit.as_ref().map_or(as_of, |e| e.exit_date);
        (end - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn sample_entry() -> Entry {
        Entry {
            symbol: "2330.TW".into(),
            date: date(3),
            price: 100.0,
            shares: 200,
            stop_price: 95.0,
            target_price: 115.0,
            strategy: StrategyLabel::TrendCheck,
            market_env: "Bull|Tailwind".into(),
        }
    }

    #[test]
    fn open_computes_fee_and_total_cost() {
        let pos = Position::open(sample_entry(), &CostModel::default());
        // 20_000 * 0.000285 = 5.7 → 5
        assert_eq!(pos.entry_fee, 5);
        assert_eq!(pos.total_cost, 20_005);
        assert_eq!(pos.id, "2024-06-03_2330.TW");
        assert_eq!(pos.status(), PositionStatus::Open);
        assert!(pos.exit.is_none());
    }

    #[test]
    fn open_truncates_fractional_notional() {
        let entry = Entry {
            price: 33.33,
            shares: 3,
            ..sample_entry()
        };
        let pos = Position::open(entry, &CostModel::default());
        // 99.99 + min fee 1 = 100.99 → 100
        assert_eq!(pos.entry_fee, 1);
        assert_eq!(pos.total_cost, 100);
    }

    #[test]
    fn open_rounds_risk_prices() {
        let entry = Entry {
            stop_price: 95.004,
            target_price: 114.996,
            ..sample_entry()
        };
        let pos = Position::open(entry, &CostModel::default());
        assert_eq!(pos.stop_price, 95.0);
        assert_eq!(pos.target_price, 115.0);
    }

    #[test]
    #[should_panic(expected = "share count must be positive")]
    fn open_rejects_zero_shares() {
        let entry = Entry {
            shares: 0,
            ..sample_entry()
        };
        Position::open(entry, &CostModel::default());
    }

    #[test]
    fn close_at_target() {
        let mut pos = Position::open(sample_entry(), &CostModel::default());
        pos.close(date(10), 115.0, ExitReason::TakeProfit, &CostModel::default());

        let exit = pos.exit.as_ref().unwrap();
        assert_eq!(pos.status(), PositionStatus::Closed);
        assert_eq!(exit.exit_price, 115.0);
        assert_eq!(exit.revenue, 23_000.0);
        // 23_000 * 0.000285 = 6.555 → 6; tax 23_000 * 0.003 = 69
        assert_eq!(exit.exit_fee, 6);
        assert_eq!(exit.exit_tax, 69);
        // 23_000 - 6 - 69 - 20_005 = 2_920
        assert_eq!(exit.net_pnl, 2_920);
        assert_eq!(exit.roi_pct, 14.6);
        assert_eq!(pos.holding_days(date(30)), 7);
    }

    #[test]
    fn close_at_stop_is_a_loss() {
        let mut pos = Position::open(sample_entry(), &CostModel::default());
        pos.close(date(4), 95.0, ExitReason::StopLoss, &CostModel::default());
        // revenue 19_000, fee 5, tax 57 → 19_000 - 62 - 20_005 = -1_067
        assert_eq!(pos.net_pnl(), Some(-1_067));
        assert_eq!(pos.exit.as_ref().unwrap().reason, ExitReason::StopLoss);
    }

    #[test]
    #[should_panic(expected = "already closed")]
    fn closing_twice_panics() {
        let costs = CostModel::default();
        let mut pos = Position::open(sample_entry(), &costs);
        pos.close(date(4), 95.0, ExitReason::StopLoss, &costs);
        pos.close(date(5), 96.0, ExitReason::StopLoss, &costs);
    }

    #[test]
    fn holding_days_for_open_position() {
        let pos = Position::open(sample_entry(), &CostModel::default());
        assert_eq!(pos.holding_days(date(13)), 10);
    }

    #[test]
    fn trigger_boundaries_are_inclusive() {
        let pos = Position::open(sample_entry(), &CostModel::default());
        assert!(pos.should_stop_loss(95.0));
        assert!(!pos.should_stop_loss(95.01));
        assert!(pos.should_take_profit(115.0));
        assert!(!pos.should_take_profit(114.99));
    }

    #[test]
    fn labels_round_trip_through_strings() {
        for label in [
            StrategyLabel::InstitutionalFlow,
            StrategyLabel::TrendCheck,
            StrategyLabel::DipBuy,
        ] {
            assert_eq!(label.to_string().parse::<StrategyLabel>(), Ok(label));
        }
        for reason in [ExitReason::StopLoss, ExitReason::TakeProfit, ExitReason::TrendBreak] {
            assert_eq!(reason.to_string().parse::<ExitReason>(), Ok(reason));
        }
        assert!("Momentum".parse::<StrategyLabel>().is_err());
    }

    #[test]
    fn only_trend_check_exits_on_trend_break() {
        assert!(StrategyLabel::TrendCheck.exits_on_trend_break());
        assert!(!StrategyLabel::InstitutionalFlow.exits_on_trend_break());
        assert!(!StrategyLabel::DipBuy.exits_on_trend_break());
    }

    proptest! {
        #[test]
        fn total_cost_is_truncated_sum(price in 1.0..2_000.0_f64, shares in 1..5_000_i64) {
            let price = round2(price);
            let costs = CostModel::default();
            let entry = Entry { price, shares, ..sample_entry() };
            let pos = Position::open(entry, &costs);
            let expected = (shares as f64 * price + pos.entry_fee as f64) as i64;
            prop_assert_eq!(pos.total_cost, expected);
            prop_assert_eq!(pos.entry_fee, costs.fee(shares as f64 * price, false).fee);
        }
    }
}
