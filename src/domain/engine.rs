//! Daily decision engine.
//!
//! One run: classify the regime, close positions whose exit rules fire,
//! score the symbols not already held, then allocate new positions to the
//! best-ranked candidates until the open-position cap is reached.

use crate::domain::cost::CostModel;
use crate::domain::ledger::PositionLedger;
use crate::domain::position::{round2, Entry, Position};
use crate::domain::regime::{self, RegimePair, RegimeStatus};
use crate::domain::scorer::{score_candidates, Candidate};
use crate::domain::series::{MarketSnapshot, SymbolBar};
use crate::domain::universe::SkippedCode;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Immutable run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub goal_profit: f64,
    pub budget_per_symbol: f64,
    pub max_daily_positions: usize,
    pub target_pct: f64,
    pub stop_loss_pct: f64,
    pub costs: CostModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_capital: 100_000.0,
            goal_profit: 300_000.0,
            budget_per_symbol: 20_000.0,
            max_daily_positions: 5,
            target_pct: 0.15,
            stop_loss_pct: 0.05,
            costs: CostModel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Dropped by strict mode before allocation.
    StrictMode,
    AlreadyHeld,
    /// A position with the same trade id is already on the ledger.
    AlreadyTraded,
    CapReached,
    ZeroShares,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::StrictMode => "below strict-mode minimum score",
            RejectReason::AlreadyHeld => "already held",
            RejectReason::AlreadyTraded => "already traded today",
            RejectReason::CapReached => "daily position cap reached",
            RejectReason::ZeroShares => "budget buys zero shares",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub symbol: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub run_date: NaiveDate,
    pub regime: RegimePair,
    pub regime_status: RegimeStatus,
    pub strict: bool,
    pub closed: Vec<Position>,
    pub opened: Vec<Position>,
    pub rejected: Vec<Rejection>,
    pub skipped: Vec<SkippedCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome {
    /// Nothing could be evaluated; the ledger was not touched.
    NoSignal { reason: String },
    Traded(DayReport),
}

#[derive(Debug, Clone)]
pub struct DayResult {
    pub ledger: PositionLedger,
    pub outcome: DayOutcome,
}

/// Stop price for an entry at `price`.
///
/// The percentage floor is raised to the trend reference when that lies
/// strictly below the price.
pub fn stop_price(price: f64, trend_reference: Option<f64>, stop_loss_pct: f64) -> f64 {
    let floor = price * (1.0 - stop_loss_pct);
    let support = trend_reference.filter(|m| *m < price);
    round2(support.map_or(floor, |m| m.max(floor)))
}

pub fn target_price(price: f64, target_pct: f64) -> f64 {
    round2(price * (1.0 + target_pct))
}

pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(&self, mut ledger: PositionLedger, snapshot: &MarketSnapshot) -> DayResult {
        let Some(run_date) = snapshot.run_date() else {
            return no_signal(ledger, "domestic index has no bars");
        };
        if snapshot.symbols.is_empty() {
            return no_signal(ledger, "no eligible symbols");
        }

        let (regime, regime_status) = regime::classify(snapshot, run_date);
        let strict = regime.is_strict();

        let today_bars: BTreeMap<String, SymbolBar> = snapshot
            .symbols
            .iter()
            .filter_map(|(code, s)| s.on(run_date).map(|b| (code.clone(), b.clone())))
            .collect();
        let closed = ledger.evaluate_exits(&today_bars, run_date, &self.config.costs);

        let unheld = snapshot.symbols.values().filter(|s| !ledger.has_open(&s.code));
        let scored = score_candidates(unheld, run_date, regime);

        let mut rejected: Vec<Rejection> = scored
            .strict_filtered
            .into_iter()
            .map(|symbol| Rejection {
                symbol,
                reason: RejectReason::StrictMode,
            })
            .collect();
        let opened = self.allocate(&mut ledger, &scored.candidates, run_date, &mut rejected);

        let mut skipped = snapshot.skipped.clone();
        skipped.extend(scored.skipped);

        log::info!(
            "{}: regime {}, closed {}, opened {}, rejected {}",
            run_date,
            regime,
            closed.len(),
            opened.len(),
            rejected.len()
        );

        DayResult {
            ledger,
            outcome: DayOutcome::Traded(DayReport {
                run_date,
                regime,
                regime_status,
                strict,
                closed,
                opened,
                rejected,
                skipped,
            }),
        }
    }

    fn allocate(
        &self,
        ledger: &mut PositionLedger,
        candidates: &[Candidate],
        run_date: NaiveDate,
        rejected: &mut Vec<Rejection>,
    ) -> Vec<Position> {
        let mut opened = Vec::new();

        for candidate in candidates {
            let reject = |reason| Rejection {
                symbol: candidate.symbol.clone(),
                reason,
            };

            if ledger.has_open(&candidate.symbol) {
                rejected.push(reject(RejectReason::AlreadyHeld));
                continue;
            }
            if ledger.contains_id(&Position::trade_id(run_date, &candidate.symbol)) {
                rejected.push(reject(RejectReason::AlreadyTraded));
                continue;
            }
            if ledger.open_count() >= self.config.max_daily_positions {
                rejected.push(reject(RejectReason::CapReached));
                continue;
            }

            let price = candidate.close;
            let shares = (self.config.budget_per_symbol / price).floor() as i64;
            if shares <= 0 {
                rejected.push(reject(RejectReason::ZeroShares));
                continue;
            }

            let position = Position::open(
                Entry {
                    symbol: candidate.symbol.clone(),
                    date: run_date,
                    price,
                    shares,
                    stop_price: stop_price(
                        price,
                        candidate.trend_reference,
                        self.config.stop_loss_pct,
                    ),
                    target_price: target_price(price, self.config.target_pct),
                    strategy: candidate.strategy,
                    market_env: candidate.market_env(),
                },
                &self.config.costs,
            );
            log::info!(
                "opened {} ({}, score {}): {} @ {:.2}, stop {:.2}, target {:.2}",
                position.symbol,
                position.strategy,
                candidate.score,
                position.shares,
                position.entry_price,
                position.stop_price,
                position.target_price
            );
            ledger.append(position.clone());
            opened.push(position);
        }

        opened
    }
}

fn no_signal(ledger: PositionLedger, reason: &str) -> DayResult {
    log::warn!("no signal: {reason}");
    DayResult {
        ledger,
        outcome: DayOutcome::NoSignal {
            reason: reason.to_string(),
        },
    }
}
