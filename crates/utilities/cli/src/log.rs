//! Logging flags and configuration.

use crate::LogFormat;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::LevelFilter;

/// How often the log file is rotated.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate every minute.
    Minutely,
    /// Rotate every hour.
    Hourly,
    /// Rotate every day.
    Daily,
    /// Never rotate.
    #[default]
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Self::MINUTELY,
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

/// Logging flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity from 0 (off) to 5 (trace).
    #[arg(
        long = "log.verbosity",
        short = 'v',
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=5),
        env = "FERRY_LOG_VERBOSITY"
    )]
    pub level: u8,
    /// Disables logging to stdout.
    #[arg(long = "log.stdout.quiet", short = 'q', env = "FERRY_LOG_STDOUT_QUIET")]
    pub stdout_quiet: bool,
    /// The format of stdout logs.
    #[arg(long = "log.stdout.format", default_value = "full", env = "FERRY_LOG_STDOUT_FORMAT")]
    pub stdout_format: LogFormat,
    /// Writes logs to files in this directory.
    #[arg(long = "log.file.directory", env = "FERRY_LOG_FILE_DIRECTORY")]
    pub file_directory: Option<PathBuf>,
    /// The format of file logs.
    #[arg(long = "log.file.format", default_value = "full", env = "FERRY_LOG_FILE_FORMAT")]
    pub file_format: LogFormat,
    /// How often log files are rotated.
    #[arg(long = "log.file.rotation", default_value = "never", env = "FERRY_LOG_FILE_ROTATION")]
    pub file_rotation: LogRotation,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            level: 3,
            stdout_quiet: false,
            stdout_format: LogFormat::Full,
            file_directory: None,
            file_format: LogFormat::Full,
            file_rotation: LogRotation::Never,
        }
    }
}

/// Stdout logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdoutLogConfig {
    /// The log format.
    pub format: LogFormat,
}

/// File logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    /// The directory log files are written to.
    pub directory_path: PathBuf,
    /// The log format.
    pub format: LogFormat,
    /// The rotation policy.
    pub rotation: LogRotation,
}

/// The logging configuration used to initialize the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// The most verbose level that is logged.
    pub global_level: LevelFilter,
    /// Stdout logging, `None` to disable it.
    pub stdout_logs: Option<StdoutLogConfig>,
    /// File logging, `None` to disable it.
    pub file_logs: Option<FileLogConfig>,
}

impl LogConfig {
    /// Builds the configuration from the parsed [`LogArgs`].
    pub fn new(args: LogArgs) -> Self {
        let stdout_logs =
            (!args.stdout_quiet).then_some(StdoutLogConfig { format: args.stdout_format });
        let file_logs = args.file_directory.map(|directory_path| FileLogConfig {
            directory_path,
            format: args.file_format,
            rotation: args.file_rotation,
        });
        Self { global_level: level_filter(args.level), stdout_logs, file_logs }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogArgs::default())
    }
}

const fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockCommand {
        #[clap(flatten)]
        pub log: LogArgs,
    }

    #[test]
    fn test_defaults_log_info_to_stdout() {
        let args = MockCommand::parse_from(["test"]).log;
        assert_eq!(args, LogArgs::default());
        assert_eq!(
            LogConfig::new(args),
            LogConfig {
                global_level: LevelFilter::INFO,
                stdout_logs: Some(StdoutLogConfig { format: LogFormat::Full }),
                file_logs: None,
            }
        );
    }

    #[rstest]
    #[case(0, LevelFilter::OFF)]
    #[case(1, LevelFilter::ERROR)]
    #[case(2, LevelFilter::WARN)]
    #[case(4, LevelFilter::DEBUG)]
    #[case(5, LevelFilter::TRACE)]
    fn test_verbosity_levels(#[case] verbosity: u8, #[case] expected: LevelFilter) {
        let verbosity = verbosity.to_string();
        let args = MockCommand::parse_from(["test", "--log.verbosity", verbosity.as_str()]).log;
        assert_eq!(LogConfig::new(args).global_level, expected);
    }

    #[test]
    fn test_verbosity_out_of_range_is_rejected() {
        assert!(MockCommand::try_parse_from(["test", "-v", "6"]).is_err());
    }

    #[test]
    fn test_file_logs_and_quiet_stdout() {
        let args = MockCommand::parse_from([
            "test",
            "-q",
            "--log.file.directory",
            "/tmp/ferry",
            "--log.file.format",
            "json",
            "--log.file.rotation",
            "daily",
        ])
        .log;

        let config = LogConfig::new(args);
        assert_eq!(config.stdout_logs, None);
        assert_eq!(
            config.file_logs,
            Some(FileLogConfig {
                directory_path: PathBuf::from("/tmp/ferry"),
                format: LogFormat::Json,
                rotation: LogRotation::Daily,
            })
        );
    }
}
