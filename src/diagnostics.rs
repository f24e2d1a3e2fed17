//! Diagnostic output for tree operations.
//!
//! Trees never log through global state. Each tree holds a [`DiagnosticSink`]
//! handed to it at construction; the default [`TracingSink`] forwards events
//! to `tracing`, and [`NullSink`] drops them. A sink only observes: nothing it
//! does can change what an operation returns.

use std::fmt;

pub use tracing::Level;

/// The part of the crate an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    BinaryTree,
    AvlTree,
}

impl Subsystem {
    pub fn tag(self) -> &'static str {
        match self {
            Subsystem::BinaryTree => "bitree",
            Subsystem::AvlTree => "avl",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Receives `(subsystem, severity, message)` events from a tree.
pub trait DiagnosticSink {
    /// Whether events at `level` for `subsystem` are wanted at all. Messages
    /// are only formatted when this returns `true`.
    fn enabled(&self, _subsystem: Subsystem, _level: Level) -> bool {
        true
    }

    fn record(&self, subsystem: Subsystem, level: Level, message: fmt::Arguments<'_>);
}

/// Forwards events to the `tracing` dispatcher, tagged with a `subsystem` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn enabled(&self, _subsystem: Subsystem, level: Level) -> bool {
        level <= tracing::level_filters::LevelFilter::current()
    }

    fn record(&self, subsystem: Subsystem, level: Level, message: fmt::Arguments<'_>) {
        let subsystem = subsystem.tag();
        if level == Level::ERROR {
            tracing::error!(subsystem, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(subsystem, "{}", message);
        } else if level == Level::INFO {
            tracing::info!(subsystem, "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(subsystem, "{}", message);
        } else {
            tracing::trace!(subsystem, "{}", message);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn enabled(&self, _subsystem: Subsystem, _level: Level) -> bool {
        false
    }

    fn record(&self, _subsystem: Subsystem, _level: Level, _message: fmt::Arguments<'_>) {}
}

/// Emits an event on a sink, skipping the formatting when the sink is not
/// interested.
macro_rules! diag {
    ($sink:expr, $subsystem:expr, $level:expr, $($arg:tt)+) => {{
        let sink: &dyn $crate::diagnostics::DiagnosticSink = &*$sink;
        if sink.enabled($subsystem, $level) {
            sink.record($subsystem, $level, format_args!($($arg)+));
        }
    }};
}

pub(crate) use diag;


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn subsystem_tags() {
        assert_eq!(Subsystem::BinaryTree.tag(), "bitree");
        assert_eq!(Subsystem::AvlTree.to_string(), "avl");
    }

    #[test]
    fn null_sink_is_never_enabled() {
        assert!(!NullSink.enabled(Subsystem::AvlTree, Level::ERROR));
    }

    #[test]
    fn diag_formats_into_recording_sink() {
        let sink = RecordingSink::default();
        diag!(&sink, Subsystem::AvlTree, Level::DEBUG, "rotating at depth {}", 3);
        assert!(sink.contains("avl", "rotating at depth 3"));
    }

    #[test]
    fn tracing_sink_without_subscriber_does_not_panic() {
        let sink = TracingSink;
        diag!(&sink, Subsystem::BinaryTree, Level::WARN, "nothing listens");
    }
}
