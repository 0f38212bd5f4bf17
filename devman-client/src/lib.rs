pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod tui;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

pub use admin::{DeviceAdmin, TagUpdate};
pub use error::{DeviceAdminError, TransportError};

/// Entrypoint used by `main.rs` to run the full CLI.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
