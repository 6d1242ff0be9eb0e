//! Market data access port.

use crate::domain::error::LionError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code` dated within `[start_date, end_date]`, oldest
    /// first. An unknown code is an error; a known code with no bars in the
    /// window returns an empty vector.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, LionError>;
}
