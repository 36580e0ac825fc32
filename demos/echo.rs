use std::time::Duration;
use sitebricks_channel_rs::{Channel, ChannelOptions, NetworkStatus};
use tokio::sync::watch;

/// Talks to a running Sitebricks server and echoes whatever it sends back.
///
/// Configure with either `CHANNEL_OPTIONS` (a JSON `ChannelOptions`
/// document) or `CHANNEL_PAGE_URL` plus an optional `CHANNEL_PREFIX`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitebricks_channel_rs=debug".into()),
        )
        .init();

    let options = match std::env::var("CHANNEL_OPTIONS") {
        Ok(json) => serde_json::from_str::<ChannelOptions>(&json)?,
        Err(_) => ChannelOptions {
            page_url: std::env::var("CHANNEL_PAGE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/".to_string()),
            url_prefix: std::env::var("CHANNEL_PREFIX").unwrap_or_default(),
            ..Default::default()
        },
    };

    let channel = Channel::new(options)?;
    println!("📡 Channel endpoint: {}\n", channel.url());

    channel.on_message(|data| println!("⬅️  {}", data))?;
    channel.on_reconnect(|| println!("🔄 Reconnected, state should be refreshed"))?;
    channel.on_disconnect(|| println!("❌ Server unreachable, still retrying"))?;

    // Stand-in for an OS connectivity monitor
    let (network, status) = watch::channel(NetworkStatus::Online);
    let watcher = channel.watch_network(status);

    channel.connect()?;

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let mut count = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                count += 1;
                let sent = channel.send(Some("echo"), &format!("hello #{}", count));
                println!("➡️  echo #{} {}", count, if sent { "sent" } else { "dropped (not open)" });

                let snapshot = channel.snapshot().await?;
                println!("   state={:?} attempts={}", snapshot.transport_state, snapshot.attempts);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nShutting down...");
    channel.shutdown();
    drop(network);
    watcher.await?;
    println!("Done!");

    Ok(())
}
