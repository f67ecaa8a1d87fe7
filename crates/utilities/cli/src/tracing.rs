//! Installs the global [tracing_subscriber] registry.

use crate::{CliResult, FileLogConfig, LogConfig};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::MakeWriter,
    prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The name prefix of log files.
const LOG_FILE_PREFIX: &str = "ferry.log";

/// How log lines are rendered.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines with span context.
    #[default]
    Full,
    /// One JSON object per line.
    Json,
    /// Multi-line output for local debugging.
    Pretty,
    /// Single-line output without span context.
    Compact,
}

fn format_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    match format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

impl FileLogConfig {
    /// Opens the rolling log file in the configured directory, creating the directory if needed.
    pub fn appender(&self) -> CliResult<RollingFileAppender> {
        Ok(RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(LOG_FILE_PREFIX)
            .build(&self.directory_path)?)
    }
}

impl LogConfig {
    /// Initializes the global tracing subscriber.
    ///
    /// `env_filter` defaults to `RUST_LOG`. The configured verbosity is added on top of it.
    pub fn init_tracing_subscriber(
        &self,
        env_filter: Option<EnvFilter>,
    ) -> CliResult<()> {
        let file_layer = match &self.file_logs {
            Some(file_logs) => Some(format_layer(file_logs.format, file_logs.appender()?)),
            None => None,
        };

        let stdout_layer = self
            .stdout_logs
            .as_ref()
            .map(|stdout_logs| format_layer(stdout_logs.format, std::io::stdout));

        let env_filter = env_filter
            .unwrap_or_else(EnvFilter::from_default_env)
            .add_directive(self.global_level.into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stdout_layer)
            .try_init()?;
        Ok(())
    }
}

/// Initializes tracing for tests. Later calls are no-ops.
pub fn init_test_tracing() {
    let _ = LogConfig::default().init_tracing_subscriber(None);
}
