//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    self as engine, BacktestConfig, BacktestResult, PortfolioConfig, PortfolioResult,
};
use crate::domain::config_validation::{
    parse_date, parse_key, validate_backtest_config, validate_data_config,
    validate_data_source, validate_portfolio_config,
};
use crate::domain::equity::EquityCurve;
use crate::domain::error::QuantError;
use crate::domain::metrics::{MetricsConfig, MetricsResult, DEFAULT_PERIODS_PER_YEAR};
use crate::domain::portfolio::Rebalance;
use crate::domain::prediction::{linear_forecast, ForecastConfig, LinearForecast};
use crate::domain::returns::ReturnKind;
use crate::domain::signal::{SignalMode, StrategyKind};
use crate::domain::universe::{load_universe, parse_codes, MIN_PORTFOLIO_ASSETS};
use crate::domain::weights::WeightScheme;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;

#[derive(Parser, Debug)]
#[command(name = "quantdash", about = "Strategy backtests and portfolio analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one asset
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [data] code
        #[arg(long)]
        code: Option<String>,
        /// Write the equity curve as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyse a weighted portfolio of assets
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the portfolio equity curve as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List codes available in the data directory
    ListCodes {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Where and what to load, from the `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub directory: PathBuf,
    pub codes: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            code,
            output,
        } => run_backtest(&config, code.as_deref(), output.as_deref()),
        Command::Portfolio { config, output } => run_portfolio(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListCodes { config } => run_list_codes(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn build_metrics_config(config: &dyn ConfigPort) -> Result<MetricsConfig, QuantError> {
    let periods_per_year = match parse_key::<u32>(config, "backtest", "periods_per_year")? {
        Some(0) => {
            return Err(QuantError::ConfigInvalid {
                section: "backtest".into(),
                key: "periods_per_year".into(),
                reason: "periods_per_year must be a positive integer".into(),
            });
        }
        Some(p) => p,
        None => DEFAULT_PERIODS_PER_YEAR,
    };

    Ok(MetricsConfig {
        periods_per_year,
        risk_free_rate: config.get_double("backtest", "risk_free_rate", 0.0),
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, QuantError> {
    validate_backtest_config(config)?;

    let strategy = match config
        .get_string("backtest", "strategy")
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .as_str()
    {
        "momentum" => StrategyKind::Momentum {
            lookback: parse_key::<usize>(config, "backtest", "lookback")?.unwrap_or(1),
            mode: parse_key::<SignalMode>(config, "backtest", "signal")?.unwrap_or_default(),
        },
        _ => StrategyKind::BuyAndHold,
    };

    Ok(BacktestConfig {
        strategy,
        return_kind: parse_key::<ReturnKind>(config, "backtest", "returns")?.unwrap_or_default(),
        metrics: build_metrics_config(config)?,
    })
}

/// `Some` when either forecast key is set; the other falls back to its default.
pub fn build_forecast_config(
    config: &dyn ConfigPort,
) -> Result<Option<ForecastConfig>, QuantError> {
    let horizon = parse_key::<usize>(config, "backtest", "forecast_horizon")?;
    let lookback = parse_key::<usize>(config, "backtest", "forecast_lookback")?;
    if horizon.is_none() && lookback.is_none() {
        return Ok(None);
    }

    let defaults = ForecastConfig::default();
    Ok(Some(ForecastConfig {
        horizon: horizon.unwrap_or(defaults.horizon),
        lookback: lookback.unwrap_or(defaults.lookback),
    }))
}

pub fn build_portfolio_config(config: &dyn ConfigPort) -> Result<PortfolioConfig, QuantError> {
    validate_portfolio_config(config)?;

    Ok(PortfolioConfig {
        weights: parse_key::<WeightScheme>(config, "portfolio", "weights")?.unwrap_or_default(),
        rebalance: parse_key::<Rebalance>(config, "portfolio", "rebalance")?.unwrap_or_default(),
        metrics: build_metrics_config(config)?,
    })
}

pub fn build_data_settings(
    config: &dyn ConfigPort,
    code_override: Option<&str>,
) -> Result<DataSettings, QuantError> {
    match code_override {
        Some(_) => validate_data_source(config)?,
        None => validate_data_config(config)?,
    }

    let directory = PathBuf::from(
        config
            .get_string("data", "directory")
            .unwrap_or_default()
            .trim(),
    );

    let codes = match code_override {
        Some(c) => parse_codes(c)?,
        None => resolve_codes(config)?,
    };

    let start_date = config
        .get_string("data", "start_date")
        .map(|s| parse_date(&s, "data", "start_date"))
        .transpose()?;
    let end_date = config
        .get_string("data", "end_date")
        .map(|s| parse_date(&s, "data", "end_date"))
        .transpose()?;

    Ok(DataSettings {
        directory,
        codes,
        start_date,
        end_date,
    })
}

/// `[data] codes` wins over `[data] code`.
pub fn resolve_codes(config: &dyn ConfigPort) -> Result<Vec<String>, QuantError> {
    let raw = config
        .get_string("data", "codes")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| config.get_string("data", "code"))
        .ok_or_else(|| QuantError::ConfigMissing {
            section: "data".into(),
            key: "code".into(),
        })?;
    Ok(parse_codes(&raw)?)
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config)?;
    let forecast_config = build_forecast_config(&config)?;
    let data = build_data_settings(&config, code_override)?;

    let code = match data.codes.as_slice() {
        [code] => code,
        codes => {
            return Err(QuantError::ConfigInvalid {
                section: "data".into(),
                key: "code".into(),
                reason: format!("backtest takes exactly one code, got {}", codes.len()),
            });
        }
    };

    let adapter = CsvAdapter::new(data.directory.clone());
    let prices = adapter.fetch_prices(code, data.start_date, data.end_date)?;
    tracing::info!(code = %code, points = prices.len(), "running backtest");

    let result = engine::run(&prices, &bt_config)?;
    print!("{}", format_backtest_summary(&result));

    // a forecast that cannot be fitted does not fail the backtest
    if let Some(fc) = forecast_config {
        match linear_forecast(&prices, &fc) {
            Ok(forecast) => print!("{}", format_forecast_summary(&forecast, &fc)),
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "forecast skipped");
                eprintln!("warning: forecast skipped ({e})");
            }
        }
    }

    if let Some(path) = output_path {
        write_equity_csv(path, &result.equity)?;
        tracing::info!(path = %path.display(), "equity curve written");
    }
    Ok(())
}

fn run_portfolio(config_path: &Path, output_path: Option<&Path>) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let pf_config = build_portfolio_config(&config)?;
    let data = build_data_settings(&config, None)?;

    let adapter = CsvAdapter::new(data.directory.clone());
    let universe = load_universe(
        &adapter,
        &data.codes,
        data.start_date,
        data.end_date,
        MIN_PORTFOLIO_ASSETS,
    )?;
    for skipped in &universe.skipped {
        eprintln!("warning: skipping {} ({})", skipped.code, skipped.reason);
    }

    let result = engine::run_portfolio(&universe.prices, &pf_config)?;
    print!("{}", format_portfolio_summary(&result));

    if let Some(path) = output_path {
        write_equity_csv(path, &result.equity)?;
        tracing::info!(path = %path.display(), "equity curve written");
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let data = build_data_settings(&config, None)?;

    if config.get_string("backtest", "strategy").is_some() {
        let bt = build_backtest_config(&config)?;
        println!("backtest:  {} ({:?} returns)", bt.strategy, bt.return_kind);
    }
    if config.get_string("portfolio", "weights").is_some()
        || config.get_string("portfolio", "rebalance").is_some()
    {
        let pf = build_portfolio_config(&config)?;
        println!("portfolio: {:?} weights, {:?} rebalance", pf.weights, pf.rebalance);
    }
    println!("data:      {} ({})", data.directory.display(), data.codes.join(", "));
    println!("Configuration is valid.");
    Ok(())
}

fn run_list_codes(config_path: &Path) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let directory = config
        .get_string("data", "directory")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| QuantError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })?;

    let codes = CsvAdapter::new(PathBuf::from(directory.trim())).list_codes()?;
    if codes.is_empty() {
        eprintln!("No price files found");
    }
    for code in &codes {
        println!("{code}");
    }
    Ok(())
}

fn write_metrics(out: &mut String, m: &MetricsResult) {
    let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Annualized:       {:.2}%", m.annualized_return * 100.0);
    let _ = writeln!(out, "Volatility:       {:.2}%", m.annualized_volatility * 100.0);
    let _ = writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Sortino Ratio:    {:.2}", m.sortino_ratio);
    let _ = writeln!(out, "Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Drawdown Periods: {}", m.max_drawdown_duration);
}

pub fn format_backtest_summary(result: &BacktestResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} | {} ===", result.code, result.strategy);
    if let (Some(first), Some(last)) = (result.equity.points().first(), result.equity.points().last()) {
        let _ = writeln!(
            out,
            "Period:           {} to {} ({} periods)",
            first.date,
            last.date,
            result.equity.len() - 1
        );
    }
    let _ = writeln!(out, "Final Equity:     {:.4}", result.equity.final_equity());
    write_metrics(&mut out, &result.metrics);
    out
}

pub fn format_forecast_summary(forecast: &LinearForecast, config: &ForecastConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n=== Linear Forecast ({} periods, fitted on last {}) ===",
        config.horizon, config.lookback
    );
    let _ = writeln!(out, "Slope per Period: {:.4}", forecast.slope);
    let _ = writeln!(out, "Fitted Last:      {:.4}", forecast.fitted_last);
    for point in forecast.points.iter().take(3) {
        let _ = writeln!(out, "  +{:<3}            {:.4}", point.step, point.price);
    }
    if let Some(last) = forecast.points.last().filter(|p| p.step > 3) {
        let _ = writeln!(out, "  ...");
        let _ = writeln!(out, "  +{:<3}            {:.4}", last.step, last.price);
    }
    out
}

fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        "   n/a".to_string()
    } else {
        format!("{value:6.2}")
    }
}

pub fn format_portfolio_summary(result: &PortfolioResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Portfolio ({} assets) ===", result.weights.len());
    let _ = writeln!(out, "Final Equity:     {:.4}", result.equity.final_equity());
    write_metrics(&mut out, &result.metrics);

    if let Some(benchmark) = &result.benchmark {
        let m = &benchmark.metrics;
        let _ = writeln!(out, "\n=== No-Rebalance Benchmark ===");
        let _ = writeln!(out, "Final Equity:     {:.4}", benchmark.equity.final_equity());
        let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0);
        let _ = writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio);
        let _ = writeln!(out, "Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    }

    let _ = writeln!(out, "\n=== Per-Asset ===");
    let _ = writeln!(out, "{:<8} {:>7} {:>9} {:>8} {:>7}", "code", "weight", "return", "vol", "sharpe");
    for (code, weight) in result.weights.iter() {
        let Some(m) = result.asset_metrics.get(code) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{:<8} {:>6.1}% {:>8.2}% {:>7.2}% {:>7.2}",
            code,
            weight * 100.0,
            m.total_return * 100.0,
            m.annualized_volatility * 100.0,
            m.sharpe_ratio
        );
    }

    let assets = result.correlation.assets();
    let _ = writeln!(out, "\n=== Correlation ===");
    let _ = write!(out, "{:<8}", "");
    for a in assets {
        let _ = write!(out, " {a:>6}");
    }
    let _ = writeln!(out);
    for (a, row) in assets.iter().zip(result.correlation.rows()) {
        let _ = write!(out, "{a:<8}");
        for value in row {
            let _ = write!(out, " {}", format_ratio(*value));
        }
        let _ = writeln!(out);
    }
    out
}

pub fn write_equity_csv(path: &Path, curve: &EquityCurve) -> Result<(), QuantError> {
    let to_data_err = |e: csv::Error| QuantError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    };

    let mut writer = csv::Writer::from_path(path).map_err(to_data_err)?;
    writer.write_record(["date", "equity"]).map_err(to_data_err)?;
    for point in curve.points() {
        writer
            .write_record([point.date.to_string(), point.equity.to_string()])
            .map_err(to_data_err)?;
    }
    writer.flush()?;
    Ok(())
}
