pub mod config;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod store;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding applications.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the default filter.
/// Call once from the surrounding layer's startup path.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
