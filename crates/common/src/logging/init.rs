use std::io;

use tracing::{info, level_filters::LevelFilter, Subscriber};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt::{format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use super::types::{LogFormat, LoggerConfig};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// INFO by default, overridable through `RUST_LOG`.
pub fn default_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

fn fmt_layer<S, W>(format: LogFormat, span_events: FmtSpan, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(span_events);
    match format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Installs the global subscriber described by `config`.
///
/// Fails if a global subscriber is already set.
pub fn init(config: LoggerConfig) -> Result<(), TryInitError> {
    let stdout = fmt_layer(
        config.stdout_format,
        config.span_events.clone(),
        io::stdout,
        true,
    );
    let file = config.file.as_ref().map(|file| {
        let appender = RollingFileAppender::new(
            file.rotation.clone(),
            &file.directory,
            &file.file_name_prefix,
        );
        // no color codes in files
        fmt_layer(file.format, FmtSpan::NONE, appender, false)
    });

    tracing_subscriber::registry()
        .with(default_filter())
        .with(stdout)
        .with(file)
        .try_init()?;

    info!(
        service = %config.service_name,
        stdout_format = ?config.stdout_format,
        log_dir = ?config.file.as_ref().map(|f| &f.directory),
        "logging initialized"
    );
    Ok(())
}
