//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::csv_export;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::backtest::{self, BacktestConfig, BacktestRequest};
use crate::domain::candle::Granularity;
use crate::domain::error::SignalForgeError;
use crate::domain::fetcher::{FetchConfig, HistoricalFetcher, SleepPacer};
use crate::domain::multifactor::{self, FactorScores, MultiFactorConfig};
use crate::domain::simulator::TieBreak;
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "signalforge", about = "Trading signal backtesting engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch candle history from the exchange into the local store
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "1d")]
        granularity: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Run a backtest over a date range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Cap on returned signals; 0 means unlimited
        #[arg(long, default_value_t = 0)]
        count: usize,
        /// Write the signal set to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show stored candle coverage for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "1d")]
        granularity: String,
    },
    /// Generate a live multi-factor signal from stored candles
    Generate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 0.0)]
        sentiment: f64,
        #[arg(long, default_value_t = 0.0)]
        news: f64,
        #[arg(long, default_value_t = 0.0)]
        volume: f64,
        #[arg(long, default_value_t = 0.0)]
        pattern: f64,
        #[arg(long, default_value_t = 0.0)]
        economic: f64,
        #[arg(long, default_value_t = 0.0)]
        sector: f64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Fetch {
            config,
            symbol,
            granularity,
            start,
            end,
        } => run_fetch(&config, &symbol, &granularity, &start, &end),
        Command::Backtest {
            config,
            symbol,
            start,
            end,
            count,
            output,
        } => run_backtest(&config, &symbol, &start, &end, count, output.as_ref()),
        Command::Info {
            config,
            symbol,
            granularity,
        } => run_info(&config, &symbol, &granularity),
        Command::Generate {
            config,
            symbol,
            sentiment,
            news,
            volume,
            pattern,
            economic,
            sector,
        } => {
            let external = FactorScores {
                technical: 0.0,
                sentiment,
                news,
                volume,
                pattern,
                economic,
                sector,
            };
            run_generate(&config, &symbol, external)
        }
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SignalForgeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteStore, SignalForgeError> {
    let store = SqliteStore::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn parse_cli_date(raw: &str, what: &str) -> Result<NaiveDate, SignalForgeError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| SignalForgeError::ConfigInvalid {
        section: "cli".into(),
        key: what.into(),
        reason: format!("'{}' is not a YYYY-MM-DD date: {}", raw, e),
    })
}

fn parse_cli_granularity(raw: &str) -> Result<Granularity, SignalForgeError> {
    Granularity::parse(raw).ok_or_else(|| SignalForgeError::ConfigInvalid {
        section: "cli".into(),
        key: "granularity".into(),
        reason: format!("unknown granularity '{}'", raw),
    })
}

pub fn build_fetch_config(config: &dyn ConfigPort) -> FetchConfig {
    let defaults = FetchConfig::default();
    FetchConfig {
        pacing: Duration::from_millis(
            config.get_int("fetch", "pacing_ms", defaults.pacing.as_millis() as i64) as u64,
        ),
        burst_every: config.get_int("fetch", "burst_every", defaults.burst_every as i64) as usize,
        burst_pause: Duration::from_millis(config.get_int(
            "fetch",
            "burst_pause_ms",
            defaults.burst_pause.as_millis() as i64,
        ) as u64),
        max_retries: config.get_int("fetch", "max_retries", defaults.max_retries as i64) as u32,
        base_delay: Duration::from_millis(config.get_int(
            "fetch",
            "base_delay_ms",
            defaults.base_delay.as_millis() as i64,
        ) as u64),
    }
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
) -> Result<BacktestConfig, SignalForgeError> {
    let mut cfg = BacktestConfig::default();

    cfg.simulator.lookahead_days =
        config.get_int("backtest", "lookahead_days", cfg.simulator.lookahead_days);
    cfg.simulator.tie_break =
        match config.get_string("backtest", "tie_break").as_deref() {
            None | Some("target_first") => TieBreak::TargetFirst,
            Some("stop_first") => TieBreak::StopFirst,
            Some(other) => {
                return Err(SignalForgeError::ConfigInvalid {
                    section: "backtest".into(),
                    key: "tie_break".into(),
                    reason: format!("'{}' is not target_first or stop_first", other),
                })
            }
        };

    let risk = &mut cfg.frequency.standard_risk;
    risk.stop_loss_pct = config.get_double("risk", "stop_loss_pct", risk.stop_loss_pct);
    risk.take_profit_pct = config.get_double("risk", "take_profit_pct", risk.take_profit_pct);
    risk.min_risk_reward = config.get_double("risk", "min_risk_reward", risk.min_risk_reward);

    validate_backtest_config(&cfg)?;
    Ok(cfg)
}

fn validate_backtest_config(cfg: &BacktestConfig) -> Result<(), SignalForgeError> {
    let invalid = |key: &str, reason: String| SignalForgeError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason,
    };

    if cfg.simulator.lookahead_days <= 0 {
        return Err(invalid(
            "lookahead_days",
            format!("{} must be positive", cfg.simulator.lookahead_days),
        ));
    }

    let risk = &cfg.frequency.standard_risk;
    for (key, value) in [
        ("stop_loss_pct", risk.stop_loss_pct),
        ("take_profit_pct", risk.take_profit_pct),
    ] {
        if !(value > 0.0 && value < 1.0) {
            return Err(invalid(key, format!("{} must be inside (0, 1)", value)));
        }
    }
    if risk.min_risk_reward <= 0.0 {
        return Err(invalid(
            "min_risk_reward",
            format!("{} must be positive", risk.min_risk_reward),
        ));
    }

    Ok(())
}

fn run_fetch(
    config_path: &PathBuf,
    symbol: &str,
    granularity_raw: &str,
    start_raw: &str,
    end_raw: &str,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<usize, SignalForgeError> {
        let granularity = parse_cli_granularity(granularity_raw)?;
        let midnight = NaiveTime::default();
        let start = parse_cli_date(start_raw, "start")?.and_time(midnight).and_utc();
        let end = parse_cli_date(end_raw, "end")?.and_time(midnight).and_utc();

        let store = open_store(&config)?;
        let exchange = BinanceAdapter::from_config(&config)?;
        let pacer = SleepPacer;
        let fetcher =
            HistoricalFetcher::new(&exchange, &store, build_fetch_config(&config), &pacer);

        eprintln!("Fetching {} {} from {} to {}", symbol, granularity, start_raw, end_raw);
        fetcher.fetch(symbol, granularity, start, end)
    })();

    match result {
        Ok(saved) => {
            eprintln!("Saved {} bars", saved);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_backtest(
    config_path: &PathBuf,
    symbol: &str,
    start_raw: &str,
    end_raw: &str,
    count: usize,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), SignalForgeError> {
        let request = BacktestRequest {
            symbol: symbol.to_string(),
            start: parse_cli_date(start_raw, "start")?,
            end: parse_cli_date(end_raw, "end")?,
            desired_signal_count: count,
        };
        let backtest_config = build_backtest_config(&config)?;
        let store = open_store(&config)?;

        // heal signals a crashed run left without an outcome
        let recovered = backtest::recover_missing_outcomes(&store, symbol, &backtest_config)?;
        if recovered > 0 {
            eprintln!("Recovered outcomes for {} unsimulated signals", recovered);
        }

        eprintln!("Backtesting {} from {} to {}", symbol, start_raw, end_raw);
        let report = backtest::run_backtest(&store, &request, &backtest_config)?;

        if report.from_cache {
            eprintln!("Serving previously generated signals for this range");
        }
        eprintln!("{}", report.signal_analysis);

        let summary = &report.summary;
        println!("Signals:          {}", summary.total_signals);
        println!("Profitable:       {}", summary.profit_signals);
        println!("Losing:           {}", summary.loss_signals);
        println!("Not opened:       {}", summary.not_opened);
        println!("Total investment: {:.2}", summary.total_investment);
        println!("Total P&L:        {:.2}", summary.total_profit_loss);
        println!("Total P&L %:      {:.2}", summary.total_profit_percentage);
        println!("Quality score:    {:.1}", summary.quality_score);
        println!("Rating:           {}", summary.rating);

        if let Some(path) = output {
            csv_export::export_to_file(&report.signals, path)?;
            eprintln!("Exported {} signals to {}", report.signals.len(), path.display());
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf, symbol: &str, granularity_raw: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), SignalForgeError> {
        let granularity = parse_cli_granularity(granularity_raw)?;
        let store = open_store(&config)?;

        match store.coverage(symbol, granularity)? {
            Some(coverage) => {
                println!("Symbol:      {}", coverage.symbol);
                println!("Granularity: {}", coverage.granularity);
                match (coverage.earliest, coverage.latest) {
                    (Some(earliest), Some(latest)) => {
                        println!("Earliest:    {}", earliest);
                        println!("Latest:      {}", latest);
                    }
                    _ => println!("No bars stored"),
                }
                println!("Bars:        {}", coverage.count);
                println!("Complete:    {}", coverage.complete);
            }
            None => println!("No coverage recorded for {} {}", symbol, granularity),
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_generate(config_path: &PathBuf, symbol: &str, external: FactorScores) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), SignalForgeError> {
        let store = open_store(&config)?;
        let mf_config = MultiFactorConfig::default();

        // score the most recent stored history
        let now = chrono::Utc::now();
        let lookback = now - chrono::Duration::days(200);
        let candles = store.candles_in_range(symbol, Granularity::OneDay, lookback, now)?;
        let last = candles.last().ok_or_else(|| SignalForgeError::NoData {
            symbol: symbol.to_string(),
            granularity: Granularity::OneDay.interval().to_string(),
        })?;

        let scores = FactorScores {
            technical: multifactor::technical_score(&candles, &mf_config.indicator_params),
            ..external
        };

        match multifactor::generate(
            symbol,
            last.timestamp.date_naive(),
            last.close,
            &scores,
            &mf_config,
        ) {
            Some(signal) => {
                println!("Direction:   {}", signal.direction.as_str());
                println!("Entry:       {:.4}", signal.entry_price);
                println!("Target:      {:.4}", signal.target_price);
                println!("Stop loss:   {:.4}", signal.stop_loss);
                println!("Risk/reward: {:.2}", signal.risk_reward_ratio);
                println!("Confidence:  {:.2}", signal.confidence);
            }
            None => println!("Combined score below decision threshold; no signal"),
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), SignalForgeError> {
        if config.get_string("sqlite", "path").is_none() {
            return Err(SignalForgeError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            });
        }
        build_backtest_config(&config)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            println!("Configuration OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
