use std::path::PathBuf;

use platform_sync_config::LoggingConfig;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

use super::format_service_name;

/// Service name used when none is configured.
const DEFAULT_SERVICE_NAME: &str = "platform-sync";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable single-line records.
    #[default]
    Compact,

    /// One JSON object per record.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

/// Rolling log files in `directory`, named `<prefix>.<date>`.
#[derive(Clone, Debug)]
pub struct FileOutput {
    pub directory: PathBuf,
    pub file_name_prefix: String,
    pub rotation: Rotation,
    pub format: LogFormat,
}

impl FileOutput {
    /// Daily rotation, compact format.
    pub fn new(directory: impl Into<PathBuf>, file_name_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name_prefix: file_name_prefix.into(),
            rotation: Rotation::DAILY,
            format: LogFormat::Compact,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub service_name: String,
    pub stdout_format: LogFormat,

    /// Span lifecycle events written to stdout. Defaults to CLOSE, which logs
    /// the busy and idle time of each `sync_pass` span when it ends.
    pub span_events: FmtSpan,

    pub file: Option<FileOutput>,
}

impl LoggerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            stdout_format: LogFormat::Compact,
            span_events: FmtSpan::CLOSE,
            file: None,
        }
    }

    /// Builds the logger settings from the `[logging]` config section.
    ///
    /// Setting `log_dir` enables file output; files use the service name as
    /// prefix unless `log_file_prefix` is given.
    pub fn from_logging_config(base_service_name: &str, section: &LoggingConfig) -> Self {
        let service_name = format_service_name(base_service_name, section.service_label.as_deref());
        let format = LogFormat::from_json_flag(section.json_format.unwrap_or(false));

        let file = section.log_dir.as_ref().map(|dir| {
            let prefix = section
                .log_file_prefix
                .clone()
                .unwrap_or_else(|| base_service_name.to_owned());
            FileOutput::new(dir.clone(), prefix).with_format(format)
        });

        Self {
            stdout_format: format,
            file,
            ..Self::new(service_name)
        }
    }

    pub fn with_stdout_format(mut self, format: LogFormat) -> Self {
        self.stdout_format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: FmtSpan) -> Self {
        self.span_events = span_events;
        self
    }

    pub fn with_file_output(mut self, file: FileOutput) -> Self {
        self.file = Some(file);
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}
