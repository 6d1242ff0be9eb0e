//! Candidate scoring: technical signals, the regime decision table, strict
//! mode, and deterministic ranking.

use crate::domain::position::StrategyLabel;
use crate::domain::regime::{DomesticRegime, RegimePair};
use crate::domain::series::{SymbolBar, SymbolSeries};
use crate::domain::universe::{SkipReason, SkippedCode};
use chrono::NaiveDate;
use std::cmp::Ordering;

pub const OVERSOLD_RSI: f64 = 30.0;

/// Minimum score a candidate needs while the foreign market is a headwind.
pub const STRICT_MIN_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    TrendAligned,
    Oversold,
    VolumeBreakout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub trend_aligned: bool,
    pub oversold: bool,
    pub volume_breakout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} not available on latest bar")]
pub struct MissingIndicator(pub &'static str);

impl Signals {
    pub fn from_bar(bar: &SymbolBar) -> Result<Self, MissingIndicator> {
        let ma20 = bar.ma20.ok_or(MissingIndicator("MA20"))?;
        let ma60 = bar.ma60.ok_or(MissingIndicator("MA60"))?;
        let rsi = bar.rsi.ok_or(MissingIndicator("RSI"))?;
        let vol_ma5 = bar.vol_ma5.ok_or(MissingIndicator("volume MA5"))?;

        Ok(Signals {
            trend_aligned: bar.close > ma20 && ma20 > ma60,
            oversold: rsi < OVERSOLD_RSI,
            volume_breakout: bar.volume as f64 > vol_ma5 && bar.close > ma20,
        })
    }

    pub fn has(&self, signal: Signal) -> bool {
        match signal {
            Signal::TrendAligned => self.trend_aligned,
            Signal::Oversold => self.oversold,
            Signal::VolumeBreakout => self.volume_breakout,
        }
    }
}

/// One row of the decision table: when `signal` holds, label and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub signal: Signal,
    pub label: StrategyLabel,
    pub score: u8,
}

const fn rule(signal: Signal, label: StrategyLabel, score: u8) -> Rule {
    Rule {
        signal,
        label,
        score,
    }
}

const BULL_RULES: &[Rule] = &[
    rule(Signal::VolumeBreakout, StrategyLabel::InstitutionalFlow, 5),
    rule(Signal::TrendAligned, StrategyLabel::TrendCheck, 4),
];

const DIP_RULES: &[Rule] = &[rule(Signal::Oversold, StrategyLabel::DipBuy, 5)];

const FLAT_RULES: &[Rule] = &[
    rule(Signal::Oversold, StrategyLabel::DipBuy, 4),
    rule(Signal::VolumeBreakout, StrategyLabel::InstitutionalFlow, 3),
];

/// Rules per domestic regime, checked in order; the first satisfied rule wins.
pub const DECISION_TABLE: &[(DomesticRegime, &[Rule])] = &[
    (DomesticRegime::Bull, BULL_RULES),
    (DomesticRegime::Panic, DIP_RULES),
    (DomesticRegime::Bear, DIP_RULES),
    (DomesticRegime::Flat, FLAT_RULES),
    (DomesticRegime::Neutral, &[]),
];

pub fn rules_for(regime: DomesticRegime) -> &'static [Rule] {
    DECISION_TABLE
        .iter()
        .find(|(r, _)| *r == regime)
        .map(|(_, rules)| *rules)
        .unwrap_or(&[])
}

pub fn lookup(regime: DomesticRegime, signals: &Signals) -> Option<(StrategyLabel, u8)> {
    rules_for(regime)
        .iter()
        .find(|r| signals.has(r.signal))
        .map(|r| (r.label, r.score))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub close: f64,
    /// MA20 on the signal bar, used as a stop reference at entry.
    pub trend_reference: Option<f64>,
    pub signals: Signals,
    pub strategy: StrategyLabel,
    pub score: u8,
    pub regime: RegimePair,
}

impl Candidate {
    pub fn market_env(&self) -> String {
        self.regime.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scored {
    /// Surviving candidates in rank order.
    pub candidates: Vec<Candidate>,
    /// Symbols that matched a rule but fell below the strict-mode minimum.
    pub strict_filtered: Vec<String>,
    /// Symbols that could not be evaluated.
    pub skipped: Vec<SkippedCode>,
}

/// Score descending, then symbol ascending.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn score_candidates<'a, I>(series: I, date: NaiveDate, regime: RegimePair) -> Scored
where
    I: IntoIterator<Item = &'a SymbolSeries>,
{
    let strict = regime.is_strict();
    let mut scored = Scored::default();

    for s in series {
        let Some(bar) = s.on(date) else {
            scored.skipped.push(SkippedCode {
                code: s.code.clone(),
                reason: SkipReason::NoBarForDate(date),
            });
            continue;
        };

        let signals = match Signals::from_bar(bar) {
            Ok(signals) => signals,
            Err(e) => {
                log::warn!("skipping {}: {}", s.code, e);
                scored.skipped.push(SkippedCode {
                    code: s.code.clone(),
                    reason: SkipReason::MissingIndicator(e.0),
                });
                continue;
            }
        };

        let Some((strategy, score)) = lookup(regime.domestic, &signals) else {
            continue;
        };

        if strict && score < STRICT_MIN_SCORE {
            log::debug!("strict mode drops {} ({}, score {})", s.code, strategy, score);
            scored.strict_filtered.push(s.code.clone());
            continue;
        }

        scored.candidates.push(Candidate {
            symbol: s.code.clone(),
            close: bar.close,
            trend_reference: bar.ma20,
            signals,
            strategy,
            score,
            regime,
        });
    }

    scored.candidates.sort_by(rank_order);
    scored
}
