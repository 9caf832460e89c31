//! Prints open positions for the account configured through the environment.
//!
//! ```sh
//! BITMEX_API_KEY=... BITMEX_API_SECRET=... \
//! BITMEX_BASE_URL=https://testnet.bitmex.com/api/v1/ \
//! RUST_LOG=bitmex_connector=debug cargo run --example positions --features tracing
//! ```

use bitmex_connector::position::PositionQuery;
use bitmex_connector::{Config, Connector};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let symbol = std::env::args().nth(1);

    let query = PositionQuery::builder().maybe_symbol(symbol).build();
    let mut connector = Connector::new(config)?;
    let positions = connector.positions(&query)?.unwrap_or_default();

    for position in positions.iter().filter(|p| p.is_open()) {
        info!(%position, "open position");
    }
    info!(
        open = positions.iter().filter(|p| p.is_open()).count(),
        remaining = ?connector.remaining_calls(),
        reset_seconds = ?connector.seconds_to_reset(),
        "done"
    );

    Ok(())
}
