//! Augments raw bars with the indicators the engine reads.

use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::{calculate_sma, calculate_volume_sma};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{IndexBar, SymbolBar};

pub const SHORT_MA: usize = 5;
pub const MID_MA: usize = 20;
pub const LONG_MA: usize = 60;
pub const VOLUME_MA: usize = 5;
pub const RSI_PERIOD: usize = 14;

/// MA5/20/60 of close, MA5 of volume and RSI(14) for every bar.
///
/// `bars` must be sorted by date.
pub fn augment_symbol_bars(bars: &[OhlcvBar]) -> Vec<SymbolBar> {
    let ma5 = calculate_sma(bars, SHORT_MA);
    let ma20 = calculate_sma(bars, MID_MA);
    let ma60 = calculate_sma(bars, LONG_MA);
    let vol_ma5 = calculate_volume_sma(bars, VOLUME_MA);
    let rsi = calculate_rsi(bars, RSI_PERIOD);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| SymbolBar {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ma5: ma5.value_at(i),
            ma20: ma20.value_at(i),
            ma60: ma60.value_at(i),
            vol_ma5: vol_ma5.value_at(i),
            rsi: rsi.value_at(i),
        })
        .collect()
}

/// Close plus MA20/MA60 of close for every index bar.
pub fn augment_index_bars(bars: &[OhlcvBar]) -> Vec<IndexBar> {
    let ma20 = calculate_sma(bars, MID_MA);
    let ma60 = calculate_sma(bars, LONG_MA);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndexBar {
            date: bar.date,
            close: bar.close,
            ma20: ma20.value_at(i),
            ma60: ma60.value_at(i),
        })
        .collect()
}
