//! Logging infrastructure with console or rolling file output.

use crate::infrastructure::config::paths;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// stderr, for one-shot commands
    Console,
    /// Daily rotating file under the config directory; the terminal panel
    /// owns the screen so nothing may be written to it
    File,
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Initialize logging.
///
/// `RUST_LOG` overrides the default level. File logs are written to:
/// - macOS: ~/Library/Application Support/rosterly/logs/
/// - Windows: %APPDATA%\rosterly\logs\
/// - Linux: ~/.config/rosterly/logs/
pub fn setup(output: LogOutput, verbose: bool) {
    match output {
        LogOutput::Console => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(filter(verbose));
            tracing_subscriber::registry().with(console_layer).init();
        }
        LogOutput::File => {
            let log_dir = paths::log_dir();

            if let Err(e) = std::fs::create_dir_all(&log_dir) {
                eprintln!(
                    "Warning: Failed to create log directory {:?}: {}",
                    log_dir, e
                );
                return;
            }

            let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "rosterly.log");
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false) // No ANSI colors in file output
                .with_writer(file_appender)
                .with_filter(filter(verbose));
            tracing_subscriber::registry().with(file_layer).init();

            tracing::info!("File logging enabled: {:?}", log_dir);
        }
    }

    tracing::info!(?output, "Logging initialized");
}
