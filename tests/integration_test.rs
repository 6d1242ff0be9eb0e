//! End-to-end daily runs over mock market data.

mod common;

use common::*;
use liontrader::cli::run_daily_pipeline;
use liontrader::domain::engine::{DayOutcome, DayReport, DayResult, EngineConfig, RejectReason};
use liontrader::domain::position::{ExitReason, StrategyLabel};
use liontrader::domain::regime::{DomesticRegime, ForeignRegime, RegimePair, RegimeStatus};
use liontrader::domain::series::IndexRole;
use liontrader::domain::universe::{build_snapshot, SkipReason};

const FLOW: &str = "2330.TW";
const TREND: &str = "2317.TW";
const FALLING: &str = "2454.TW";

/// Rising FLOW with a volume spike on the run day, rising TREND without one,
/// and a steadily falling name.
fn market() -> MockDataPort {
    let day = run_day();
    let mut flow = linear_bars(FLOW, day, 100, 100.0, 0.5);
    set_volume(&mut flow, day, 5000);

    bull_indices(MockDataPort::new(), day)
        .with_bars(FLOW, flow)
        .with_bars(TREND, linear_bars(TREND, day, 100, 50.0, 0.25))
        .with_bars(FALLING, linear_bars(FALLING, day, 100, 300.0, -1.0))
}

fn traded(result: &DayResult) -> &DayReport {
    match &result.outcome {
        DayOutcome::Traded(report) => report,
        other => panic!("expected a traded day, got {other:?}"),
    }
}

mod snapshot_assembly {
    use super::*;

    #[test]
    fn defective_symbols_are_skipped_individually() {
        let day = run_day();
        let mut broken = linear_bars("3017.TW", day, 100, 80.0, 0.1);
        broken[50].high = broken[50].low - 1.0;
        let port = market()
            .with_bars("3231.TW", linear_bars("3231.TW", day, 40, 30.0, 0.1))
            .with_bars("3017.TW", broken)
            .with_error("3037.TW", "connection reset");

        let snapshot = build_snapshot(
            &port,
            &universe(&[FLOW, "3231.TW", "6669.TW", "3017.TW", "3037.TW", TREND]),
            day,
        );

        let eligible: Vec<&str> = snapshot.symbols.keys().map(String::as_str).collect();
        assert_eq!(eligible, vec![TREND, FLOW]);

        let reasons: Vec<(&str, &SkipReason)> = snapshot
            .skipped
            .iter()
            .map(|s| (s.code.as_str(), &s.reason))
            .collect();
        assert_eq!(reasons.len(), 4);
        assert_eq!(reasons[0], ("3231.TW", &SkipReason::InsufficientBars { bars: 40 }));
        assert!(matches!(reasons[1], ("6669.TW", SkipReason::FetchFailed(_))));
        assert!(matches!(reasons[2], ("3017.TW", SkipReason::MalformedBar(_))));
        assert!(
            matches!(reasons[3], ("3037.TW", SkipReason::FetchFailed(e)) if e.contains("connection reset"))
        );
    }

    #[test]
    fn indices_carry_moving_averages() {
        let snapshot = build_snapshot(&market(), &universe(&[FLOW]), run_day());

        assert_eq!(snapshot.indices.len(), 4);
        let domestic = snapshot.index(IndexRole::Domestic).unwrap();
        let latest = domestic.latest().unwrap();
        assert_eq!(latest.date, run_day());
        assert!(latest.ma20.is_some());
        assert!(latest.ma60.is_some());
        assert_eq!(snapshot.run_date(), Some(run_day()));
    }

    #[test]
    fn missing_index_is_left_out() {
        let port = market().without("^SOX");
        let snapshot = build_snapshot(&port, &universe(&[FLOW]), run_day());
        assert!(snapshot.index(IndexRole::ForeignSecondary).is_none());
        assert!(snapshot.index(IndexRole::Domestic).is_some());
    }

    #[test]
    fn window_excludes_future_bars() {
        let day = run_day();
        let mut flow = linear_bars(FLOW, day, 100, 100.0, 0.5);
        push_bar(&mut flow, 1.0, 500.0, 250.0);
        let port = bull_indices(MockDataPort::new(), day).with_bars(FLOW, flow);

        let snapshot = build_snapshot(&port, &universe(&[FLOW]), day);
        assert_eq!(snapshot.symbols[FLOW].latest().unwrap().date, day);
    }
}

mod daily_run {
    use super::*;

    fn run(port: &MockDataPort, ledger: &MemoryLedgerPort, config: &EngineConfig) -> DayResult {
        run_daily_pipeline(
            port,
            ledger,
            config,
            &universe(&[FLOW, TREND, FALLING]),
            run_day(),
            false,
        )
        .unwrap()
        .0
    }

    #[test]
    fn bull_day_opens_ranked_positions() {
        let ledger = MemoryLedgerPort::new();
        let result = run(&market(), &ledger, &EngineConfig::default());
        let report = traded(&result);

        assert_eq!(
            report.regime,
            RegimePair {
                domestic: DomesticRegime::Bull,
                foreign: ForeignRegime::Tailwind
            }
        );
        assert_eq!(report.regime_status, RegimeStatus::Classified);

        let opened: Vec<(&str, StrategyLabel)> = report
            .opened
            .iter()
            .map(|p| (p.symbol.as_str(), p.strategy))
            .collect();
        assert_eq!(
            opened,
            vec![
                (FLOW, StrategyLabel::InstitutionalFlow),
                (TREND, StrategyLabel::TrendCheck)
            ]
        );

        // close 149.5, MA20 144.75 sits above the 5% floor of 142.03
        let flow = &report.opened[0];
        assert_eq!(flow.shares, 133);
        assert_eq!(flow.stop_price, 144.75);
        assert_eq!(flow.id, "2024-06-28_2330.TW");
        assert_eq!(flow.market_env, "Bull|Tailwind");

        assert_eq!(ledger.saves.get(), 1);
        assert_eq!(ledger.current().open_count(), 2);
    }

    #[test]
    fn rerunning_the_same_day_is_idempotent() {
        let port = market();
        let ledger = MemoryLedgerPort::new();
        let config = EngineConfig::default();

        run(&port, &ledger, &config);
        let after_first = ledger.current();
        let second = run(&port, &ledger, &config);

        assert!(traded(&second).opened.is_empty());
        assert!(traded(&second).closed.is_empty());
        assert_eq!(ledger.current(), after_first);
    }

    #[test]
    fn headwind_admits_only_top_score() {
        let day = run_day();
        let port = market().with_bars("^IXIC", linear_bars("^IXIC", day, 100, 16_000.0, -10.0));
        let ledger = MemoryLedgerPort::new();

        let result = run(&port, &ledger, &EngineConfig::default());
        let report = traded(&result);

        assert!(report.strict);
        assert_eq!(report.opened.len(), 1);
        assert_eq!(report.opened[0].symbol, FLOW);
        assert_eq!(report.opened[0].market_env, "Bull|Headwind");
        assert_eq!(report.rejected[0].symbol, TREND);
        assert_eq!(report.rejected[0].reason, RejectReason::StrictMode);
    }

    #[test]
    fn cap_limits_new_positions() {
        let ledger = MemoryLedgerPort::new();
        let config = EngineConfig {
            max_daily_positions: 1,
            ..EngineConfig::default()
        };

        let result = run(&market(), &ledger, &config);
        let report = traded(&result);

        assert_eq!(report.opened.len(), 1);
        assert_eq!(report.rejected[0].reason, RejectReason::CapReached);
        assert_eq!(result.ledger.open_count(), 1);
    }

    #[test]
    fn missing_domestic_index_is_a_no_signal_day() {
        let port = market().without("^TWII");
        let ledger = MemoryLedgerPort::new();

        let result = run(&port, &ledger, &EngineConfig::default());

        assert!(matches!(result.outcome, DayOutcome::NoSignal { .. }));
        assert_eq!(ledger.saves.get(), 0);
        assert!(ledger.current().is_empty());
    }

    #[test]
    fn missing_volatility_index_falls_back_to_neutral() {
        let port = market().with_error("^VIX", "timeout");
        let ledger = MemoryLedgerPort::new();

        let result = run(&port, &ledger, &EngineConfig::default());
        let report = traded(&result);

        assert_eq!(report.regime, RegimePair::default());
        assert!(matches!(report.regime_status, RegimeStatus::Fallback(_)));
        assert!(report.opened.is_empty());
    }

    #[test]
    fn dry_run_does_not_save() {
        let ledger = MemoryLedgerPort::new();
        let (result, _) = run_daily_pipeline(
            &market(),
            &ledger,
            &EngineConfig::default(),
            &universe(&[FLOW, TREND]),
            run_day(),
            true,
        )
        .unwrap();

        assert_eq!(traded(&result).opened.len(), 2);
        assert_eq!(ledger.saves.get(), 0);
        assert!(ledger.current().is_empty());
    }
}

mod next_day {
    use super::*;

    #[test]
    fn stop_loss_closes_on_the_following_day() {
        let day = run_day();
        let next = day + chrono::Duration::days(1);

        let mut flow = linear_bars(FLOW, day, 100, 100.0, 0.5);
        set_volume(&mut flow, day, 5000);
        push_bar(&mut flow, 139.0, 141.0, 140.0);
        let trend = linear_bars(TREND, next, 101, 50.0, 0.25);

        let port = bull_indices(MockDataPort::new(), next)
            .with_bars(FLOW, flow)
            .with_bars(TREND, trend);
        let ledger = MemoryLedgerPort::new();
        let config = EngineConfig::default();
        let codes = universe(&[FLOW, TREND]);

        run_daily_pipeline(&port, &ledger, &config, &codes, day, false).unwrap();
        let (result, _) = run_daily_pipeline(&port, &ledger, &config, &codes, next, false).unwrap();
        let report = traded(&result);

        assert_eq!(report.run_date, next);
        assert_eq!(report.closed.len(), 1);
        let closed = &report.closed[0];
        assert_eq!(closed.symbol, FLOW);

        let exit = closed.exit.as_ref().unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.exit_price, 144.75);
        // 133 shares: revenue 19251.75, fee 5, tax 57, cost 19888
        assert_eq!(exit.net_pnl, -698);

        let saved = ledger.current();
        assert_eq!(saved.open_count(), 1);
        assert!(saved.has_open(TREND));
        assert_eq!(saved.closed_positions().count(), 1);
    }
}
