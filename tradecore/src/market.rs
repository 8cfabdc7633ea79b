//! Market ticker output and watch mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tradecore_core::config::TickerConfig;
use tradecore_core::format::format_change;
use tradecore_core::ticker::{MarketTicker, TickerClient};

/// Single-line rendering of a reading, e.g. `XAUUSD  2420.50  +0.15%`.
pub fn ticker_line(ticker: &MarketTicker) -> String {
    format!(
        "{}  {:.2}  {}",
        ticker.symbol,
        ticker.price,
        format_change(ticker.change)
    )
}

/// Print one reading, or keep polling until Ctrl+C when `watch` is set.
pub fn run(config: &TickerConfig, symbol: &str, watch: bool) -> Result<()> {
    let client = TickerClient::new(config).context("failed to create ticker client")?;

    if !watch {
        println!("{}", ticker_line(&client.fetch(symbol)));
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping ticker...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let interval = Duration::from_secs(config.poll_interval_secs.max(1));
    println!(
        "Watching {} (every {}s). Press Ctrl+C to stop.",
        symbol.to_uppercase(),
        interval.as_secs()
    );

    while running.load(Ordering::SeqCst) {
        let ticker = client.fetch(symbol);
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        println!("[{}] {}", timestamp, ticker_line(&ticker));
        tracing::debug!(symbol = %ticker.symbol, price = ticker.price, "Ticker update");

        let deadline = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    Ok(())
}
