use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use surplus_agent::api::{Item, MarketplaceClient};
use surplus_agent::config::{self, AgentConfig};
use surplus_agent::notify::LogNotifier;
use surplus_agent::observability::{logging, metrics};
use surplus_agent::reservations::{PaymentUrlReady, ReservationSettings, Reservations};

#[derive(Parser)]
#[command(name = "surplus-agent")]
#[command(about = "Watch surplus-food offers and reserve them as soon as they appear", long_about = None)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, env = "SURPLUS_CONFIG", default_value = "surplus-agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print credentials as JSON
    Credentials,
    /// List favorites and their stock
    Favorites,
    /// Add or remove a favorite
    Favorite {
        item_id: String,
        #[arg(long)]
        remove: bool,
    },
    /// Show one item as JSON
    Item { item_id: String },
    /// Poll favorites and order reserved items when stock appears
    Watch {
        /// ITEM_ID or ITEM_ID:AMOUNT, repeatable
        #[arg(short, long = "reserve", value_parser = parse_reservation)]
        reserve: Vec<(String, u32)>,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
    /// Keep trying to order one unit of an item
    Spin { item_id: String },
    /// Show order status
    Status { order_ids: Vec<String> },
    /// Cancel unpaid orders
    Cancel { order_ids: Vec<String> },
    /// Print the manufacturer listing as JSON
    Manufacturer,
}

fn parse_reservation(arg: &str) -> Result<(String, u32), String> {
    match arg.split_once(':') {
        None if !arg.is_empty() => Ok((arg.to_string(), 1)),
        Some((id, amount)) if !id.is_empty() => amount
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| (id.to_string(), n))
            .ok_or_else(|| format!("invalid amount '{amount}'")),
        _ => Err(format!("invalid reservation '{arg}'")),
    }
}

fn load(path: &Path) -> Result<AgentConfig, config::ConfigError> {
    if path.exists() {
        config::load_config(path)
    } else {
        config::loader::parse_config("", |key| std::env::var(key).ok())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "surplus-agent v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut client = MarketplaceClient::from_config(&config)?.with_notifier(Arc::new(LogNotifier));

    match cli.command {
        Commands::Credentials => {
            let credentials = client.credentials().await?;
            println!("{}", serde_json::to_string_pretty(&credentials)?);
        }
        Commands::Favorites => {
            for item in client.get_favorites().await? {
                println!("{:>12}  {:>3}  {}", item.item_id(), item.items_available, item.label());
            }
        }
        Commands::Favorite { item_id, remove } => {
            client.set_favorite(&item_id, !remove).await?;
        }
        Commands::Item { item_id } => {
            let item = client.get_item(&item_id).await?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        Commands::Watch {
            reserve,
            interval_secs,
        } => {
            watch(client, &config, reserve, Duration::from_secs(interval_secs)).await?;
        }
        Commands::Spin { item_id } => {
            let (tx, rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(print_payment_urls(rx));
            let mut reservations =
                Reservations::new(client, ReservationSettings::from_config(&config.orders))
                    .with_payment_events(tx);

            match reservations.make_orders_spin(&item_id).await {
                Some(reservation) => {
                    tracing::info!(item_id = %reservation.item_id, "Spin order placed")
                }
                None => tracing::warn!(item_id = %item_id, "Spin ordering gave up"),
            }
            drop(reservations);
            let _ = printer.await;
        }
        Commands::Status { order_ids } => {
            for order_id in order_ids {
                let status = client.get_order_status(&order_id).await?;
                println!("{order_id}  {}", status.state.as_deref().unwrap_or("UNKNOWN"));
            }
        }
        Commands::Cancel { order_ids } => {
            for order_id in order_ids {
                match client.abort_order(&order_id).await {
                    Ok(()) => println!("{order_id}  cancelled"),
                    Err(e) => eprintln!("{order_id}  {e}"),
                }
            }
        }
        Commands::Manufacturer => {
            let listing = client.get_manufacturer_items().await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn watch(
    mut client: MarketplaceClient,
    config: &AgentConfig,
    reserve: Vec<(String, u32)>,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let favorites = stock_by_id(client.get_favorites().await?);

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_payment_urls(rx));
    let mut reservations = Reservations::new(client, ReservationSettings::from_config(&config.orders))
        .with_payment_events(tx);

    for (item_id, amount) in reserve {
        let name = favorites
            .get(&item_id)
            .map(Item::label)
            .unwrap_or_else(|| item_id.clone());
        reservations.reserve(item_id, name, amount);
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watch");
                break;
            }
        }

        let stock = match reservations.api_mut().get_favorites().await {
            Ok(items) => stock_by_id(items),
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch favorites");
                continue;
            }
        };

        reservations
            .make_orders(&stock, |reservation| {
                tracing::info!(
                    item_id = %reservation.item_id,
                    display_name = %reservation.display_name,
                    amount = reservation.amount,
                    "Reservation ordered"
                );
            })
            .await;
        reservations.update_active_orders().await;

        tracing::info!(
            pending = reservations.pending().len(),
            active_orders = reservations.active_orders().len(),
            "Watch cycle complete"
        );
    }

    for order in reservations.active_orders().values() {
        println!("{}  {} x{}  {}", order.id, order.item_id, order.amount, order.display_name);
    }
    drop(reservations);
    let _ = printer.await;
    Ok(())
}

fn stock_by_id(items: Vec<Item>) -> HashMap<String, Item> {
    items
        .into_iter()
        .map(|item| (item.item_id().to_string(), item))
        .collect()
}

async fn print_payment_urls(mut rx: mpsc::UnboundedReceiver<PaymentUrlReady>) {
    while let Some(event) = rx.recv().await {
        println!(
            "Pay order {} ({}) at {}",
            event.order_id, event.display_name, event.url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reservation() {
        assert_eq!(parse_reservation("42"), Ok(("42".to_string(), 1)));
        assert_eq!(parse_reservation("42:3"), Ok(("42".to_string(), 3)));
        assert!(parse_reservation("42:0").is_err());
        assert!(parse_reservation("42:x").is_err());
        assert!(parse_reservation(":2").is_err());
        assert!(parse_reservation("").is_err());
    }
}
