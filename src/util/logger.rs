use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_appender::{non_blocking, rolling};

pub struct Logger {
    pub guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let guards = Self::setup_logging(Path::new(log_dir))?;
        Ok(Logger { guards })
    }

    pub fn setup_logging(log_dir: &Path) -> Result<Vec<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
        let error_dir = log_dir.join("error");
        let json_dir = log_dir.join("json");
        let error_json_dir = error_dir.join("json");
        for dir in [log_dir, error_dir.as_path(), json_dir.as_path(), error_json_dir.as_path()] {
            std::fs::create_dir_all(dir)?;
        }

        let console_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,quotation_backend=debug"));

        let file_log_level = std::env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
        let error_file_log_level = std::env::var("ERROR_FILE_LOG_LEVEL").unwrap_or_else(|_| "error".to_string());

        // File appenders, rotated daily
        let (general, general_guard) = non_blocking(rolling::daily(log_dir, "quotation-backend.log"));
        let (errors, errors_guard) = non_blocking(rolling::daily(&error_dir, "quotation-backend-error.log"));
        let (general_json, general_json_guard) = non_blocking(rolling::daily(&json_dir, "quotation-backend.json"));
        let (errors_json, errors_json_guard) = non_blocking(rolling::daily(&error_json_dir, "quotation-backend-error.json"));

        tracing_subscriber::registry()
            .with(
                // Console output - pretty format for development
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(true)
                    .with_filter(console_filter)
            )
            .with(
                fmt::layer()
                    .with_writer(general)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&file_log_level))
            )
            .with(
                fmt::layer()
                    .with_writer(errors)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&error_file_log_level))
            )
            .with(
                fmt::layer()
                    .json()
                    .with_writer(general_json)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&file_log_level))
            )
            .with(
                fmt::layer()
                    .json()
                    .with_writer(errors_json)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&error_file_log_level))
            )
            .try_init()?;

        // Return guards to keep background threads alive
        Ok(vec![general_guard, errors_guard, general_json_guard, errors_json_guard])
    }
}
