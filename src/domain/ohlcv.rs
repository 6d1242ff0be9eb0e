//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Reason the bar cannot be used, or `None` if it is well formed.
    ///
    /// Prices must be finite and positive, high must not sit below low, and
    /// volume must be non-negative.
    pub fn defect(&self) -> Option<String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Some(format!("{} {} on {} is not a positive price", name, value, self.date));
            }
        }
        if self.high < self.low {
            return Some(format!(
                "high {} below low {} on {}",
                self.high, self.low, self.date
            ));
        }
        if self.volume < 0 {
            return Some(format!("negative volume on {}", self.date));
        }
        None
    }

    pub fn is_well_formed(&self) -> bool {
        self.defect().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            code: "2330.TW".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    #[test]
    fn well_formed_bar() {
        assert!(sample_bar().is_well_formed());
    }

    #[test]
    fn nan_close_is_defect() {
        let bar = OhlcvBar {
            close: f64::NAN,
            ..sample_bar()
        };
        assert!(bar.defect().unwrap().starts_with("close"));
    }

    #[test]
    fn zero_price_is_defect() {
        let bar = OhlcvBar {
            low: 0.0,
            ..sample_bar()
        };
        assert!(!bar.is_well_formed());
    }

    #[test]
    fn inverted_range_is_defect() {
        let bar = OhlcvBar {
            high: 80.0,
            ..sample_bar()
        };
        assert!(bar.defect().unwrap().contains("below low"));
    }

    #[test]
    fn negative_volume_is_defect() {
        let bar = OhlcvBar {
            volume: -1,
            ..sample_bar()
        };
        assert!(!bar.is_well_formed());
    }
}
