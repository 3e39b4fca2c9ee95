use binflow::core::config::ExchangeConfig;
use binflow::{build_aggregator, build_rest_api, TradeFlowConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Example usage - replace with your actual API credentials
    let config = ExchangeConfig::from_env("BINANCE").unwrap_or_else(|_| {
        ExchangeConfig::new("your_api_key".to_string(), "your_secret_key".to_string())
            .testnet(true)
    });

    let api = build_rest_api(&config)?;

    let ping = api.ping().await;
    println!("Ping: {} ({})", ping.message, ping.status_code);

    let time = api.server_time().await;
    println!("Server time: {}", time.body);

    let account = api.account_info().await;
    println!("Account: {}", account.message);

    // Watch one symbol's trade flow for a few seconds
    let handle = build_aggregator(&config, TradeFlowConfig::new("BTCUSDT"));
    let mut snapshots = handle.snapshots();

    for _ in 0..5 {
        match tokio::time::timeout(Duration::from_secs(5), snapshots.recv()).await {
            Ok(Ok(snapshot)) => println!(
                "[{}] buys: {} | sells: {}",
                snapshot.window_start, snapshot.buy_total, snapshot.sell_total
            ),
            Ok(Err(e)) => {
                println!("Snapshot feed ended: {}", e);
                break;
            }
            Err(_) => println!("No snapshot within 5s (still connecting?)"),
        }
    }

    handle.shutdown().await;
    Ok(())
}
