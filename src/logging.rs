use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}
