//! Pluggable logging for pool internals

use std::fmt;

/// Sink for the pool's diagnostic messages.
///
/// Nothing the background loop does is reported to callers directly, so this
/// (together with the metrics sink) is where connect and close failures end
/// up.
pub trait Logger: Send + Sync {
    fn debug(&self, args: fmt::Arguments<'_>);

    fn error(&self, args: fmt::Arguments<'_>);
}

/// Default logger, forwarding to `tracing`.
///
/// Install a `tracing_subscriber::fmt` subscriber to get the messages on
/// standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "esox_connectionpool", "{}", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "esox_connectionpool", "{}", args);
    }
}

/// Logger that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _args: fmt::Arguments<'_>) {}

    fn error(&self, _args: fmt::Arguments<'_>) {}
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingLogger;
    use super::*;

    #[test]
    fn test_recording_logger_separates_severities() {
        let logger = RecordingLogger::default();
        logger.debug(format_args!("probing {}", 1));
        logger.error(format_args!("failed: {}", "boom"));

        assert_eq!(logger.debug.lock().as_slice(), ["probing 1"]);
        assert_eq!(logger.errors_containing("boom"), 1);
    }

    #[test]
    fn test_builtin_loggers_accept_messages() {
        TracingLogger.debug(format_args!("debug"));
        TracingLogger.error(format_args!("error"));
        NoopLogger.debug(format_args!("debug"));
        NoopLogger.error(format_args!("error"));
    }
}
