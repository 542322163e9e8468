use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Installs the stderr subscriber. Levels come from `OUTBREAK_LOG`
/// (e.g. `OUTBREAK_LOG=outbreak_early_warning=debug`), defaulting to info.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("OUTBREAK_LOG")
            .unwrap_or_else(|_| EnvFilter::new("outbreak_early_warning=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
