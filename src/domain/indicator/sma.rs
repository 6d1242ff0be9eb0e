//! Simple moving averages of close and of volume.
//!
//! SMA(n)[i] = sum(x[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::Sma(period), |b| b.close)
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_mean(bars, period, IndicatorType::VolumeSma(period), |b| {
        b.volume as f64
    })
}

fn rolling_mean<F>(
    bars: &[OhlcvBar],
    period: usize,
    indicator_type: IndicatorType,
    field: F,
) -> IndicatorSeries
where
    F: Fn(&OhlcvBar) -> f64,
{
    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += field(bar);
        if period > 0 && i >= period {
            window_sum -= field(&bars[i - period]);
        }

        let valid = period > 0 && i + 1 >= period;
        let value = if valid {
            window_sum / period as f64
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
