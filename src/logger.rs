// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sink for terminal commit failures.
//!
//! A processor has no failure surface of its own: errors that survive the
//! retry policy are reported to an optional [`Logger`] and to the after
//! callback, never to the producer.

use std::fmt;

/// Printf-style reporting sink.
pub trait Logger: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

/// Forwards to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "bulk_engine::logger", "{}", args);
    }
}

impl<F> Logger for F
where
    F: Fn(fmt::Arguments<'_>) + Send + Sync,
{
    fn log(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_closure_logger_receives_formatted_line() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = move |args: fmt::Arguments<'_>| sink.lock().push(args.to_string());

        logger.log(format_args!("commit {} failed: {}", 3, "boom"));

        assert_eq!(lines.lock().as_slice(), ["commit 3 failed: boom"]);
    }

    #[test]
    fn test_tracing_logger_as_trait_object() {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
        logger.log(format_args!("no subscriber, no panic"));
    }
}
