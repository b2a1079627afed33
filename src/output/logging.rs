use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive applied when `RUST_LOG` is unset.
#[must_use]
pub fn log_filter(verbose: bool) -> &'static str {
    if verbose { "orphanage=debug" } else { "orphanage=warn" }
}

/// Installs the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins over `verbose`. Calling this twice is harmless; the second
/// subscriber is discarded.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter(verbose).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
