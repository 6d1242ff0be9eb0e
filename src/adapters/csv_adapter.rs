//! CSV file market data adapter.
//!
//! One file per code at `<base>/<code>.csv` with the header
//! `date,open,high,low,close,volume` and ISO dates.

use crate::domain::error::LionError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }
}

fn field<T>(record: &csv::StringRecord, idx: usize, name: &str, line: u64) -> Result<T, LionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = record.get(idx).ok_or_else(|| LionError::Data {
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| LionError::Data {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, LionError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(LionError::NoData {
                code: code.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| LionError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| LionError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str: String = field(&record, 0, "date", line)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                LionError::Data {
                    reason: format!("line {line}: invalid date '{date_str}': {e}"),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                code: code.to_string(),
                date,
                open: field(&record, 1, "open", line)?,
                high: field(&record, 2, "high", line)?,
                low: field(&record, 3, "low", line)?,
                close: field(&record, 4, "close", line)?,
                volume: field(&record, 5, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        log::debug!("{}: read {} bars from {}", code, bars.len(), path.display());
        Ok(bars)
    }
}
