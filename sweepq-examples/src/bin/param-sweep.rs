// SPDX-License-Identifier: MIT
// param-sweep: optimizer demo for sweepq
//
// - Runs one moving-average crossover backtest per (fast, slow) grid point.
// - Every backtest is a job; the dispatcher keeps all cores busy.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use sweepq::{BatchReport, Dispatcher, DispatcherArgs, DispatcherConfig, DispatcherStats};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Shortest fast moving average period
    #[arg(long, default_value_t = 2)]
    fast_min: usize,

    /// Longest fast moving average period
    #[arg(long, default_value_t = 20)]
    fast_max: usize,

    /// Shortest slow moving average period
    #[arg(long, default_value_t = 10)]
    slow_min: usize,

    /// Longest slow moving average period
    #[arg(long, default_value_t = 120)]
    slow_max: usize,

    /// Number of bars in the synthetic price series
    #[arg(long, default_value_t = 20_000)]
    bars: usize,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    dispatcher: DispatcherArgs,
}

fn validate_args(args: &Args) -> anyhow::Result<()> {
    if args.fast_min == 0 {
        bail!("--fast-min must be at least 1");
    }
    if args.fast_min > args.fast_max || args.slow_min > args.slow_max {
        bail!("parameter ranges must not be empty");
    }
    if args.fast_min >= args.slow_max {
        bail!("no combination with a fast period below the slow period");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct TrialResult {
    fast: usize,
    slow: usize,
    net_profit: f64,
    trades: usize,
}

#[derive(Debug, Serialize)]
struct SweepOutput<'a> {
    best: Option<&'a TrialResult>,
    report: &'a BatchReport,
    stats: DispatcherStats,
    trials: &'a [TrialResult],
}

/// Deterministic price series with two cycles and a slight drift.
fn synthetic_prices(bars: usize) -> Vec<f64> {
    (0..bars)
        .map(|t| {
            let t = t as f64;
            100.0 + 10.0 * (t / 150.0).sin() + 3.0 * (t / 43.0).sin() + 0.002 * t
        })
        .collect()
}

fn simple_moving_average(prices: &[f64], period: usize, end: usize) -> f64 {
    prices[end + 1 - period..=end].iter().sum::<f64>() / period as f64
}

/// Long while the fast average is above the slow one, flat otherwise.
fn backtest(prices: &[f64], fast: usize, slow: usize) -> anyhow::Result<TrialResult> {
    if prices.len() <= slow {
        bail!("{} bars are not enough for a slow period of {slow}", prices.len());
    }
    let mut long = false;
    let mut entry = 0.0;
    let mut net_profit = 0.0;
    let mut trades = 0;

    for end in slow - 1..prices.len() {
        let signal =
            simple_moving_average(prices, fast, end) > simple_moving_average(prices, slow, end);
        match (long, signal) {
            (false, true) => {
                entry = prices[end];
                long = true;
            }
            (true, false) => {
                net_profit += prices[end] - entry;
                trades += 1;
                long = false;
            }
            _ => {}
        }
    }
    if long {
        net_profit += prices[prices.len() - 1] - entry;
        trades += 1;
    }

    Ok(TrialResult {
        fast,
        slow,
        net_profit,
        trades,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    validate_args(&args)?;

    let dispatcher = Dispatcher::new(DispatcherConfig::from(&args.dispatcher))
        .context("failed to create dispatcher")?;
    info!(
        "Sweeping fast {}..={} x slow {}..={} on {} bars, {} jobs at once ({:?})",
        args.fast_min,
        args.fast_max,
        args.slow_min,
        args.slow_max,
        args.bars,
        dispatcher.concurrency_limit(),
        args.dispatcher.mode
    );

    let prices = Arc::new(synthetic_prices(args.bars));
    let results: Arc<Mutex<Vec<TrialResult>>> = Arc::new(Mutex::new(Vec::new()));

    for fast in args.fast_min..=args.fast_max {
        for slow in args.slow_min.max(fast + 1)..=args.slow_max {
            let prices = prices.clone();
            let results = results.clone();
            dispatcher.submit_fallible(format!("fast={fast} slow={slow}"), move || {
                let result = backtest(&prices, fast, slow)?;
                results
                    .lock()
                    .map_err(|_| anyhow::anyhow!("result list poisoned"))?
                    .push(result);
                Ok(())
            });
        }
    }

    let report = dispatcher.wait_for_completion();
    info!(
        "Sweep finished: {} trials, {} failed",
        report.finished,
        report.failures.len()
    );

    let mut trials = results
        .lock()
        .map_err(|_| anyhow::anyhow!("result list poisoned"))?
        .clone();
    trials.sort_by(|a, b| b.net_profit.total_cmp(&a.net_profit));
    let best = trials.first();

    if args.json {
        let output = SweepOutput {
            best,
            report: &report,
            stats: dispatcher.stats(),
            trials: &trials,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match best {
            Some(best) => println!(
                "best: fast={} slow={} net_profit={:.2} trades={}",
                best.fast, best.slow, best.net_profit, best.trades
            ),
            None => println!("no trial completed"),
        }
        for failure in &report.failures {
            println!("{failure}");
        }
    }

    report.ensure_success()
}
