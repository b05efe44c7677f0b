//! Capture of tracing output for assertions.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;

#[derive(Clone, Default)]
struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

struct SharedBufferGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBufferGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedBufferGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl io::Write for SharedBufferGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Formatted log output captured from one closure.
#[derive(Debug, Clone)]
pub struct CapturedLogs {
    text: String,
}

impl CapturedLogs {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().filter(|l| !l.trim().is_empty())
    }

    /// Lines emitted at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<&str> {
        let prefix = level_label(level);
        self.lines()
            .filter(|line| line.trim_start().starts_with(prefix))
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.at(level).len()
    }

    /// Whether any line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.at(level).iter().any(|line| line.contains(needle))
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Run `f` with a thread-local subscriber that records everything at DEBUG
/// and above, then return its result together with the captured output.
///
/// Only events from the `cxdeploy` crates are kept so backend noise does not
/// skew level counts.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let buffer = SharedBuffer::default();
    let filter = tracing_subscriber::filter::Targets::new()
        .with_target("cxdeploy", Level::DEBUG)
        .with_target("cxdeploy_db", Level::WARN);

    use tracing_subscriber::layer::SubscriberExt;
    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_target(false)
            .without_time(),
    );

    let result = tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer
        .inner
        .lock()
        .map(|guard| guard.clone())
        .unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes).into_owned();
    (result, CapturedLogs { text })
}
