//! tomlschema Language Server binary entry point
//!
//! This is a thin wrapper that calls the library's `run_server()` function.

use tomlschema_lsp::run_server;
use tracing::info;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting tomlschema Language Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    run_server().await;
}
