//! Logging for platform sync services.
//!
//! [`init`] installs a global `tracing` subscriber with an [`EnvFilter`]
//! (INFO unless `RUST_LOG` says otherwise), a stdout layer and, when
//! configured, a rolling file layer.
//!
//! [`EnvFilter`]: tracing_subscriber::EnvFilter

mod init;
mod types;


pub use init::{default_filter, init};
pub use tracing_appender::rolling::Rotation;
pub use types::{FileOutput, LogFormat, LoggerConfig};

/// Appends `label` to `base` as `base%label`, so several deployments of the
/// same service can be told apart in aggregated logs.
pub fn format_service_name(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => format!("{base}%{label}"),
        _ => base.to_owned(),
    }
}
