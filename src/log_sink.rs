use crate::Error;
use log::Level;
use std::fmt::Debug;

/// Receives diagnostic lines from adapters.
///
/// Adapters report failures here instead of returning them from
/// [`create_event`](crate::Adapter::create_event). Implementations must not block for long; event
/// delivery waits for them.
pub trait LogSink: Debug + Send + Sync {
    /// Write one line.
    fn log(&self, level: Level, message: &str);
}

/// Forwards lines to the [`log`] crate with target `analytics_dispatch`.
///
/// This is the default sink of every adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "analytics_dispatch", level, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str) {}
}

pub(crate) fn log_error(sink: &dyn LogSink, adapter: &str, err: &Error) {
    let location = err.location();
    sink.log(Level::Error, &format!("[Error] {} Error: ", adapter));
    sink.log(Level::Error, &format!("[Error] Type: {}", err.kind().name()));
    sink.log(Level::Error, &format!("[Error] Message: {}", err));
    sink.log(
        Level::Error,
        &format!("[Error] Location: {}:{}", location.file(), location.line()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Lines(Mutex<Vec<(Level, String)>>);

    impl LogSink for Lines {
        fn log(&self, level: Level, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn error_lines() {
        let sink = Lines::default();
        let err = Error::from(ErrorKind::InvalidEvent("event type is empty".into()));
        log_error(&sink, "Plausible", &err);

        let lines = sink.0.into_inner().unwrap();
        assert_eq!(4, lines.len());
        assert!(lines.iter().all(|(level, _)| *level == Level::Error));
        assert_eq!("[Error] Plausible Error: ", lines[0].1);
        assert_eq!("[Error] Type: InvalidEventError", lines[1].1);
        assert_eq!("[Error] Message: invalid event: event type is empty", lines[2].1);
        assert!(lines[3].1.starts_with("[Error] Location: "));
        assert!(lines[3].1.contains("log_sink.rs:"));
    }
}
