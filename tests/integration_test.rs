//! End-to-end tests of the engine through its public entry points.

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use common::*;
use proptest::prelude::*;
use quantdash::domain::backtest::{self, BacktestConfig, PortfolioConfig};
use quantdash::domain::error::QuantError;
use quantdash::domain::metrics::MetricsConfig;
use quantdash::domain::portfolio::{aggregate, Rebalance};
use quantdash::domain::returns::{ReturnKind, ReturnSeries};
use quantdash::domain::signal::{generate, SignalMode, StrategyKind};
use quantdash::domain::universe::{load_universe, parse_codes};
use quantdash::domain::weights::{WeightScheme, WeightVector};
use std::collections::BTreeMap;

mod single_asset {
    use super::*;

    #[test]
    fn momentum_magnitude_scenario() {
        let prices = series("T", "2024-01-01", &[100.0, 110.0, 121.0, 108.9]);
        let config = BacktestConfig {
            strategy: StrategyKind::Momentum {
                lookback: 1,
                mode: SignalMode::Magnitude,
            },
            ..BacktestConfig::default()
        };

        let result = backtest::run(&prices, &config).unwrap();

        let signals: Vec<Option<f64>> = result.signals.points().iter().map(|p| p.value).collect();
        assert_eq!(signals[0], None);
        assert_relative_eq!(signals[1].unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(signals[2].unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(signals[3].unwrap(), -0.10, epsilon = 1e-12);

        let positions: Vec<Option<f64>> =
            result.positions.points().iter().map(|p| p.value).collect();
        assert_eq!(positions[0], None);
        assert_eq!(positions[1], None);
        assert_relative_eq!(positions[2].unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(positions[3].unwrap(), 0.10, epsilon = 1e-12);

        let equity = result.equity.values();
        assert_eq!(equity.len(), 3);
        assert_eq!(equity[0], 1.0);
        assert_relative_eq!(equity[1], 1.01, epsilon = 1e-12);
        assert_relative_eq!(equity[2], 1.01 * 0.99, epsilon = 1e-12);
        assert_eq!(result.equity.points()[0].date, date(2024, 1, 2));
        assert_eq!(result.equity.points()[2].date, date(2024, 1, 4));
    }

    #[test]
    fn buy_and_hold_tracks_normalized_price() {
        let prices = series("T", "2024-01-01", &[50.0, 55.0, 52.0, 60.0, 58.5, 61.0]);
        let result = backtest::run(&prices, &BacktestConfig::default()).unwrap();

        let normalized = prices.normalized();
        assert_eq!(result.equity.len(), normalized.len());
        for (e, n) in result.equity.points().iter().zip(&normalized) {
            assert_eq!(e.date, n.date);
            assert_relative_eq!(e.equity, n.price, epsilon = 1e-12);
        }
        assert_relative_eq!(
            result.metrics.total_return,
            61.0 / 50.0 - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn log_returns_compound_to_same_buy_and_hold_curve() {
        let prices = series("T", "2024-01-01", &[100.0, 90.0, 120.0, 130.0]);
        let simple = backtest::run(&prices, &BacktestConfig::default()).unwrap();
        let log = backtest::run(
            &prices,
            &BacktestConfig {
                return_kind: ReturnKind::Log,
                ..BacktestConfig::default()
            },
        )
        .unwrap();

        for (a, b) in simple.equity.values().iter().zip(log.equity.values()) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn lookback_too_long_is_invalid_parameter() {
        let prices = series("T", "2024-01-01", &[100.0, 101.0, 102.0]);
        let config = BacktestConfig {
            strategy: StrategyKind::momentum(3),
            ..BacktestConfig::default()
        };
        assert!(matches!(
            backtest::run(&prices, &config),
            Err(QuantError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn too_few_positions_for_metrics() {
        // L = 2 on four prices leaves two signals, one lagged return
        let prices = series("T", "2024-01-01", &[100.0, 101.0, 103.0, 102.0]);
        let config = BacktestConfig {
            strategy: StrategyKind::momentum(2),
            ..BacktestConfig::default()
        };
        assert!(matches!(
            backtest::run(&prices, &config),
            Err(QuantError::InsufficientData { .. })
        ));
    }

    #[test]
    fn short_wiped_out_by_rally_stays_ruined() {
        let prices = series("T", "2024-01-01", &[100.0, 50.0, 150.0, 75.0, 225.0]);
        let config = BacktestConfig {
            strategy: StrategyKind::momentum(1),
            ..BacktestConfig::default()
        };

        let result = backtest::run(&prices, &config).unwrap();

        assert_eq!(result.equity.values(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(result.metrics.total_return, -1.0);
        assert_eq!(result.metrics.max_drawdown, -1.0);
        assert_relative_eq!(result.metrics.annualized_return, -1.0 / 3.0 * 252.0, epsilon = 1e-9);
    }

    #[test]
    fn flat_prices_have_zero_sharpe() {
        let prices = series("T", "2024-01-01", &[10.0, 10.0, 10.0, 10.0]);
        let result = backtest::run(&prices, &BacktestConfig::default()).unwrap();
        assert_eq!(result.metrics.annualized_volatility, 0.0);
        assert_eq!(result.metrics.sharpe_ratio, 0.0);
        assert_eq!(result.metrics.max_drawdown, 0.0);
    }

    #[test]
    fn periods_per_year_scales_annualization() {
        let prices = series("T", "2024-01-01", &[100.0, 102.0, 101.0, 104.0, 103.0]);
        let daily = backtest::run(&prices, &BacktestConfig::default()).unwrap();
        let weekly = backtest::run(
            &prices,
            &BacktestConfig {
                metrics: MetricsConfig {
                    periods_per_year: 52,
                    risk_free_rate: 0.0,
                },
                ..BacktestConfig::default()
            },
        )
        .unwrap();

        assert_relative_eq!(
            daily.metrics.annualized_return / 252.0,
            weekly.metrics.annualized_return / 52.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            daily.metrics.annualized_volatility / 252f64.sqrt(),
            weekly.metrics.annualized_volatility / 52f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(daily.metrics.max_drawdown, weekly.metrics.max_drawdown);
    }

    #[test]
    fn rerun_is_bit_identical() {
        let prices = series("T", "2024-01-01", &[100.0, 97.0, 99.5, 104.0, 101.0, 108.0]);
        let config = BacktestConfig {
            strategy: StrategyKind::momentum(2),
            ..BacktestConfig::default()
        };
        let a = backtest::run(&prices, &config).unwrap();
        let b = backtest::run(&prices, &config).unwrap();
        assert_eq!(a.equity, b.equity);
        assert_eq!(a.metrics, b.metrics);
    }
}

mod portfolio {
    use super::*;

    #[test]
    fn anti_correlated_pair_is_flat() {
        let a = from_returns("A", "2024-01-01", &[0.01, -0.01, 0.02]);
        let b = from_returns("B", "2024-01-01", &[-0.01, 0.01, -0.02]);

        let result = backtest::run_portfolio(&universe(&[a, b]), &PortfolioConfig::default()).unwrap();

        for e in result.equity.values() {
            assert_abs_diff_eq!(e, 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(result.correlation.get("A", "B").unwrap(), -1.0, epsilon = 1e-9);
        assert_relative_eq!(result.correlation.get("B", "A").unwrap(), -1.0, epsilon = 1e-9);
        assert_eq!(result.correlation.get("A", "A"), Some(1.0));
        assert_relative_eq!(result.weights.get("A").unwrap(), 0.5);
        assert_eq!(result.asset_metrics.len(), 2);
    }

    #[test]
    fn identical_assets_aggregate_to_component() {
        let returns = from_returns("X", "2024-01-01", &[0.03, -0.02, 0.015, 0.0, -0.04])
            .returns(ReturnKind::Simple);
        let map: BTreeMap<String, ReturnSeries> = ["A", "B", "C"]
            .iter()
            .map(|c| (c.to_string(), returns.clone()))
            .collect();
        let weights = WeightVector::equal(map.keys().cloned()).unwrap();

        let portfolio = aggregate(&map, &weights).unwrap();
        assert_eq!(portfolio.len(), returns.len());
        for (p, r) in portfolio.values().iter().zip(returns.values()) {
            assert_relative_eq!(*p, r, epsilon = 1e-15);
        }
    }

    #[test]
    fn uses_only_shared_dates() {
        let a = series("A", "2024-01-01", &[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let b = series("B", "2024-01-03", &[50.0, 51.0, 50.5, 52.0]);

        let result = backtest::run_portfolio(&universe(&[a, b]), &PortfolioConfig::default()).unwrap();

        let dates: Vec<_> = result.equity.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5), date(2024, 1, 6)]
        );
        assert_eq!(result.asset_equity["A"].len(), result.asset_equity["B"].len());
    }

    #[test]
    fn disjoint_assets_fail_with_no_overlap() {
        let a = series("A", "2024-01-01", &[100.0, 101.0, 102.0]);
        let b = series("B", "2024-03-01", &[50.0, 51.0, 52.0]);
        assert!(matches!(
            backtest::run_portfolio(&universe(&[a, b]), &PortfolioConfig::default()),
            Err(QuantError::NoOverlap { assets: 2 })
        ));
    }

    #[test]
    fn custom_weights_must_match_assets() {
        let a = series("A", "2024-01-01", &[100.0, 101.0, 102.0, 100.0]);
        let b = series("B", "2024-01-01", &[50.0, 51.0, 50.5, 52.0]);
        let config = PortfolioConfig {
            weights: "A:0.5,C:0.5".parse().unwrap(),
            ..PortfolioConfig::default()
        };
        assert!(matches!(
            backtest::run_portfolio(&universe(&[a, b]), &config),
            Err(QuantError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn weights_not_summing_to_one_rejected() {
        let a = series("A", "2024-01-01", &[100.0, 101.0, 102.0, 100.0]);
        let b = series("B", "2024-01-01", &[50.0, 51.0, 50.5, 52.0]);
        let config = PortfolioConfig {
            weights: "A:0.6,B:0.6".parse().unwrap(),
            ..PortfolioConfig::default()
        };
        assert!(matches!(
            backtest::run_portfolio(&universe(&[a, b]), &config),
            Err(QuantError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn inverse_volatility_favours_calmer_asset() {
        let calm = from_returns("CALM", "2024-01-01", &[0.01, -0.01, 0.01, -0.01, 0.01]);
        let wild = from_returns("WILD", "2024-01-01", &[0.04, -0.04, 0.04, -0.04, 0.04]);
        let config = PortfolioConfig {
            weights: WeightScheme::InverseVolatility,
            rebalance: Rebalance::Monthly,
            ..PortfolioConfig::default()
        };

        let result = backtest::run_portfolio(&universe(&[calm, wild]), &config).unwrap();

        let w_calm = result.weights.get("CALM").unwrap();
        let w_wild = result.weights.get("WILD").unwrap();
        assert_relative_eq!(w_calm + w_wild, 1.0, epsilon = 1e-12);
        assert_relative_eq!(w_calm / w_wild, 4.0, epsilon = 1e-6);

        let vol = result.asset_volatility();
        assert!(vol["WILD"] > vol["CALM"]);
    }

    #[test]
    fn inverse_volatility_of_flat_asset_is_insufficient_data() {
        let flat = series("FLAT", "2024-01-01", &[10.0, 10.0, 10.0, 10.0]);
        let b = series("B", "2024-01-01", &[10.0, 11.0, 10.5, 12.0]);
        let config = PortfolioConfig {
            weights: WeightScheme::InverseVolatility,
            ..PortfolioConfig::default()
        };
        assert!(matches!(
            backtest::run_portfolio(&universe(&[flat, b]), &config),
            Err(QuantError::InsufficientData { .. })
        ));
    }

    #[test]
    fn loads_universe_through_data_port() {
        let port = MockPriceDataPort::new()
            .with_prices("AAPL", "2024-01-01", &[100.0, 102.0, 101.0, 105.0, 107.0])
            .with_prices("MSFT", "2024-01-01", &[200.0, 198.0, 202.0, 204.0, 203.0])
            .with_error("GOOG", "connection reset");

        let codes = parse_codes("aapl, msft, goog").unwrap();
        let loaded = load_universe(&port, &codes, None, Some(date(2024, 1, 4)), 2).unwrap();
        assert_eq!(loaded.count(), 2);
        assert_eq!(loaded.skipped[0].code, "GOOG");
        assert_eq!(loaded.prices["AAPL"].len(), 4);

        let result = backtest::run_portfolio(&loaded.prices, &PortfolioConfig::default()).unwrap();
        assert_eq!(result.equity.len(), 4);
        assert!(result.metrics.max_drawdown <= 0.0);
    }
}

proptest! {
    #[test]
    fn momentum_defines_n_minus_lookback_signals(
        prices in prop::collection::vec(1.0f64..1000.0, 2..60),
        lookback_seed in 1usize..60,
    ) {
        let n = prices.len();
        let lookback = 1 + lookback_seed % (n - 1);
        let series = series("P", "2020-01-01", &prices);

        let signals = generate(&series, &StrategyKind::momentum(lookback)).unwrap();
        prop_assert_eq!(signals.len(), n);
        prop_assert_eq!(signals.defined_count(), n - lookback);
        for (i, point) in signals.points().iter().enumerate() {
            prop_assert_eq!(point.value.is_some(), i >= lookback);
        }
    }

    #[test]
    fn correlation_symmetric_with_unit_diagonal(
        a in prop::collection::vec(-0.05f64..0.05, 3..30),
        b in prop::collection::vec(-0.05f64..0.05, 3..30),
    ) {
        let n = a.len().min(b.len());
        let sa = from_returns("A", "2021-01-01", &a[..n]);
        let sb = from_returns("B", "2021-01-01", &b[..n]);

        let result = backtest::run_portfolio(&universe(&[sa, sb]), &PortfolioConfig::default()).unwrap();
        let ab = result.correlation.get("A", "B").unwrap();
        let ba = result.correlation.get("B", "A").unwrap();
        prop_assert!(ab.is_nan() && ba.is_nan() || ab == ba);
        prop_assert!(ab.is_nan() || (-1.0..=1.0).contains(&ab));
        for code in ["A", "B"] {
            let d = result.correlation.get(code, code).unwrap();
            prop_assert!(d.is_nan() || d == 1.0);
        }
    }
}
