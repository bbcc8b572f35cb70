//! ebbtide - Main Entry Point
//!
//! Wires the data engine, price feed and strategy runner for paper
//! sessions, or replays history through the backtest engine.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ebbtide::common::channels;
use ebbtide::{
    strategy_from_name, AppConfig, Backoff, BacktestEngine, CoinbaseTransport, DataEngine,
    EngineEvent, EventBus, MemoryStore, Mode, PaperExchange, PriceFeed, PublicMarketData,
    RateLimiter, StrategyRunner,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ebbtide.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the configured mode (paper, backtest)
    #[arg(long)]
    mode: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ebbtide::load_config(Some(&args.config)).context("loading configuration")?;
    if let Some(mode) = args.mode.as_deref() {
        config.mode = match mode {
            "paper" => Mode::Paper,
            "backtest" => Mode::Backtest,
            "live" => Mode::Live,
            other => bail!("unknown mode '{other}'"),
        };
    }

    info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        strategy = %config.strategy,
        mode = %config.mode,
        "starting ebbtide"
    );

    match config.mode {
        Mode::Paper => run_paper(config).await,
        Mode::Backtest => run_backtest(config).await,
        Mode::Live => {
            bail!("live mode needs an authenticated exchange adapter; run paper or backtest")
        }
    }
}

async fn run_paper(config: AppConfig) -> Result<()> {
    let market_data = Arc::new(PublicMarketData::new(&config.data.rest_url)?);
    let exchange = Arc::new(PaperExchange::new(market_data));
    let limiter = RateLimiter::new(
        config.data.rate_limit_capacity,
        Duration::from_secs(config.data.rate_limit_window_secs),
    );
    let data = Arc::new(DataEngine::new(
        exchange.clone(),
        limiter,
        Duration::from_secs(config.poll_seconds),
    ));

    let (tick_tx, tick_rx) = channels::create_tick_channel();
    let transport = Arc::new(CoinbaseTransport::new(
        config.data.feed_url.clone(),
        &config.symbol,
    ));
    let feed = PriceFeed::new(
        transport,
        tick_tx,
        Backoff::new(
            Duration::from_secs(config.data.backoff_initial_secs),
            Duration::from_secs(config.data.backoff_max_secs),
        ),
    );
    let feed_handle = feed.handle();
    let feed_task = tokio::spawn(feed.run());

    let (events, mut event_rx) = EventBus::bounded(channels::DEFAULT_CHANNEL_SIZE);
    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                EngineEvent::OrderPlaced(order) => {
                    info!(id = order.id, side = %order.side, status = ?order.status, "order placed")
                }
                EngineEvent::PositionUpdated(Some(pos)) => {
                    info!(qty = %pos.quantity, entry = %pos.entry_price, "position updated")
                }
                EngineEvent::PositionUpdated(None) => info!("position flat"),
                EngineEvent::StrategySignal { strategy, signal, price } => {
                    info!(%strategy, %signal, %price, "strategy signal")
                }
                EngineEvent::PriceUpdated { price, .. } => {
                    tracing::debug!(%price, "price updated")
                }
                EngineEvent::EmergencyStop { symbol } => warn!(%symbol, "EMERGENCY STOP"),
            }
        }
    });

    let strategy = strategy_from_name(&config.strategy)?;
    let store = Arc::new(MemoryStore::new());
    let runner = StrategyRunner::new(
        config,
        data,
        exchange,
        store,
        strategy,
        events,
        Some(tick_rx),
    );
    let control = runner.control();
    let runner_task = tokio::spawn(runner.run());

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal, stopping");
    control.stop();
    feed_handle.stop();

    let final_state = runner_task.await?;
    info!(
        phase = ?final_state.phase,
        pnl_today = %final_state.realized_pnl_today,
        "session ended"
    );
    feed_task.abort();
    event_task.abort();
    Ok(())
}

async fn run_backtest(config: AppConfig) -> Result<()> {
    let market_data = PublicMarketData::new(&config.data.rest_url)?;
    let bars = ebbtide::Exchange::fetch_ohlcv(
        &market_data,
        &config.symbol,
        &config.timeframe,
        config.lookback,
    )
    .await
    .context("fetching history")?;
    info!(bars = bars.len(), "history fetched");

    let mut strategy = strategy_from_name(&config.strategy)?;
    let engine = BacktestEngine::new(&config);
    let control = ebbtide::ControlHandle::new();
    let result = engine.run(&bars, strategy.as_mut(), &control)?;

    println!("backtest: {} ({})", config.symbol, config.strategy);
    println!("  trades:        {}", result.trade_count);
    println!("  win rate:      {:.2}%", result.win_rate_pct);
    println!("  total return:  {:.2}%", result.total_return_pct);
    println!("  max drawdown:  {:.2}%", result.max_drawdown_pct);
    println!("  final equity:  {:.2}", result.final_equity);
    Ok(())
}
