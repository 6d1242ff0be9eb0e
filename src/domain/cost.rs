//! Transaction fee and tax model.
//!
//! Broker fee = max(trunc(amount * fee_rate * fee_discount), min_fee) on
//! both sides; transaction tax = trunc(amount * tax_rate) on sells only.
//! All results are whole currency units, truncated rather than rounded.

/// Fee schedule for one market.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    pub fee_rate: f64,
    pub fee_discount: f64,
    pub tax_rate: f64,
    pub min_fee: i64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            fee_rate: 0.001425,
            fee_discount: 0.2,
            tax_rate: 0.003,
            min_fee: 1,
        }
    }
}

/// Fee and tax charged on one fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeCost {
    pub fee: i64,
    pub tax: i64,
}

impl TradeCost {
    pub fn total(&self) -> i64 {
        self.fee + self.tax
    }
}

impl CostModel {
    /// Cost of trading `amount` of notional.
    ///
    /// # Panics
    ///
    /// If `amount` is negative or not finite.
    pub fn fee(&self, amount: f64, is_sell: bool) -> TradeCost {
        assert!(
            amount.is_finite() && amount >= 0.0,
            "trade amount must be a non-negative number, got {amount}"
        );

        let fee = ((amount * self.fee_rate * self.fee_discount) as i64).max(self.min_fee);
        let tax = if is_sell {
            (amount * self.tax_rate) as i64
        } else {
            0
        };
        TradeCost { fee, tax }
    }
}
