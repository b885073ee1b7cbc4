//! Warning log layer
//!
//! A tracing layer that copies WARN and ERROR events (unsupported finder
//! names, failed tool invocations, ...) into their own file and hands each
//! written line to the host over a channel, so an editor can surface it.
//! Repeats of the same message inside a short window are dropped; the next
//! copy after the window notes how many were dropped.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const DEDUP_WINDOW: Duration = Duration::from_secs(5);
const MAX_TRACKED_MESSAGES: usize = 64;

/// Tracks recently written messages.
struct RepeatFilter {
    seen: HashMap<String, Seen>,
    window: Duration,
}

struct Seen {
    last: Instant,
    dropped: usize,
}

impl RepeatFilter {
    fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
        }
    }

    /// `None` when the message should be dropped, otherwise the number of
    /// copies dropped since it was last written.
    fn admit(&mut self, message: &str, now: Instant) -> Option<usize> {
        if self.seen.len() >= MAX_TRACKED_MESSAGES {
            let window = self.window;
            self.seen
                .retain(|_, seen| now.duration_since(seen.last) < window);
        }

        match self.seen.get_mut(message) {
            Some(seen) if now.duration_since(seen.last) < self.window => {
                seen.dropped += 1;
                None
            }
            Some(seen) => {
                let dropped = std::mem::take(&mut seen.dropped);
                seen.last = now;
                Some(dropped)
            }
            None => {
                self.seen.insert(
                    message.to_string(),
                    Seen {
                        last: now,
                        dropped: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

/// Layer writing WARN+ events to the warnings file.
pub struct WarningLogLayer {
    file: Mutex<File>,
    filter: Mutex<RepeatFilter>,
    notifier: mpsc::Sender<String>,
}

/// Host side of the warning log.
pub struct WarningLogHandle {
    /// Receives every line written to the warnings file
    pub receiver: mpsc::Receiver<String>,
    pub path: PathBuf,
}

/// Create the layer writing to [`super::log_dirs::warnings_log_path`].
pub fn create() -> std::io::Result<(WarningLogLayer, WarningLogHandle)> {
    create_with_path(super::log_dirs::warnings_log_path())
}

pub fn create_with_path(path: PathBuf) -> std::io::Result<(WarningLogLayer, WarningLogHandle)> {
    let file = File::create(&path)?;
    let (notifier, receiver) = mpsc::channel();

    let layer = WarningLogLayer {
        file: Mutex::new(file),
        filter: Mutex::new(RepeatFilter::new(DEDUP_WINDOW)),
        notifier,
    };
    Ok((layer, WarningLogHandle { receiver, path }))
}

impl WarningLogLayer {
    fn format_line(level: Level, target: &str, message: &str, dropped: usize) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        if dropped > 0 {
            format!("{timestamp} {level} {target}: {message} ({dropped} repeats dropped)")
        } else {
            format!("{timestamp} {level} {target}: {message}")
        }
    }
}

impl<S> Layer<S> for WarningLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > Level::WARN {
            return;
        }

        let mut message = MessageVisitor::default();
        event.record(&mut message);

        let dropped = match self.filter.lock() {
            Ok(mut filter) => filter.admit(&message.0, Instant::now()),
            Err(_) => Some(0),
        };
        let Some(dropped) = dropped else {
            return;
        };

        let line = Self::format_line(level, metadata.target(), &message.0, dropped);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }

        // The host may have dropped its receiver
        let _ = self.notifier.send(line);
    }
}

/// Collects the `message` field followed by any other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor(String);

impl MessageVisitor {
    fn push(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        use std::fmt::Write as _;
        if name == "message" {
            let rest = std::mem::take(&mut self.0);
            let _ = write!(self.0, "{value}");
            if !rest.is_empty() {
                self.0.push(' ');
                self.0.push_str(&rest);
            }
        } else {
            if !self.0.is_empty() {
                self.0.push(' ');
            }
            let _ = write!(self.0, "{name}={value}");
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field.name(), format_args!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field.name(), format_args!("{value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_filter_drops_within_window() {
        let mut filter = RepeatFilter::new(Duration::from_secs(5));
        let start = Instant::now();

        assert_eq!(filter.admit("poetry failed", start), Some(0));
        assert_eq!(filter.admit("poetry failed", start + Duration::from_secs(1)), None);
        assert_eq!(filter.admit("poetry failed", start + Duration::from_secs(2)), None);
        assert_eq!(filter.admit("other", start + Duration::from_secs(2)), Some(0));
    }

    #[test]
    fn test_repeat_filter_reports_dropped_count_after_window() {
        let mut filter = RepeatFilter::new(Duration::from_secs(5));
        let start = Instant::now();

        filter.admit("msg", start);
        filter.admit("msg", start + Duration::from_secs(1));
        filter.admit("msg", start + Duration::from_secs(2));
        assert_eq!(filter.admit("msg", start + Duration::from_secs(10)), Some(2));
        assert_eq!(filter.admit("msg", start + Duration::from_secs(20)), Some(0));
    }

    #[test]
    fn test_repeat_filter_stays_bounded() {
        let mut filter = RepeatFilter::new(Duration::from_secs(5));
        let start = Instant::now();
        for i in 0..MAX_TRACKED_MESSAGES {
            filter.admit(&format!("msg {i}"), start);
        }
        filter.admit("late", start + Duration::from_secs(60));
        assert_eq!(filter.seen.len(), 1);
    }

    #[test]
    fn test_format_line_mentions_dropped_repeats() {
        let line = WarningLogLayer::format_line(Level::WARN, "pyright_env", "hello", 3);
        assert!(line.ends_with("WARN pyright_env: hello (3 repeats dropped)"));

        let line = WarningLogLayer::format_line(Level::ERROR, "pyright_env", "hello", 0);
        assert!(line.ends_with("ERROR pyright_env: hello"));
    }
}
