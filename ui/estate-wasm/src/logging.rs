//! `tracing` output to the browser console.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_wasm::{WASMLayer, WASMLayerConfigBuilder};

const DEFAULT_FILTER: &str = "info,ee_client_core=debug";

/// Installs the console subscriber once; later calls are no-ops.
pub fn init() {
    let console = WASMLayer::new(
        WASMLayerConfigBuilder::new()
            .set_max_level(Level::DEBUG)
            .set_report_logs_in_timings(false)
            .build(),
    );
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(DEFAULT_FILTER))
        .with(console)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_valid() -> anyhow::Result<()> {
        EnvFilter::try_new(DEFAULT_FILTER)?;
        Ok(())
    }
}
