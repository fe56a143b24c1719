//! Logging setup shared by the tracker binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "qr_tracker=info,qr_tracker_server=info";

/// Initialize tracing to stderr. `RUST_LOG` wins over the defaults;
/// `verbose` lowers the default to debug.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "qr_tracker=debug,qr_tracker_server=debug"
    } else {
        DEFAULT_LOG_FILTER
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
