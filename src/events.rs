//! Leveled progress events emitted by the engine and the campaign driver.
//!
//! [`EventSink`] is the seam: the engine only knows it can report `info`,
//! `error` and `success`. [`EventLog`] is the process implementation,
//! forwarding to the `log` facade and optionally keeping a timestamped run
//! transcript on disk. [`MemorySink`] records events for tests.
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
    Success,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        }
    }
}

pub trait EventSink {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, level: Level, message: &str) {
        (**self).emit(level, message);
    }
}

/// Process-wide event sink. Created once at startup; the transcript file is
/// flushed after every line and closed when the value drops.
#[derive(Debug, Default)]
pub struct EventLog {
    transcript: RefCell<Option<BufWriter<File>>>,
    transcript_path: Option<PathBuf>,
}

impl EventLog {
    /// Console only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Console plus a transcript at `path` (parent directories are created).
    pub fn with_transcript<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            transcript: RefCell::new(Some(BufWriter::new(file))),
            transcript_path: Some(path.to_path_buf()),
        })
    }

    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }

    fn write_transcript(&self, level: Level, message: &str) {
        let mut slot = self.transcript.borrow_mut();
        let Some(w) = slot.as_mut() else {
            return;
        };
        let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let res = writeln!(w, "[{}] [{}] {}", ts, level.label(), message).and_then(|_| w.flush());
        if let Err(e) = res {
            // Transcript failures are non-fatal.
            log::warn!("transcript write failed, disabling transcript: {}", e);
            *slot = None;
        }
    }
}

impl EventSink for EventLog {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Info => log::info!("{}", message),
            Level::Error => log::error!("{}", message),
            Level::Success => log::info!("{}", message.green().bold()),
        }
        self.write_transcript(level, message);
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Some(w) = self.transcript.get_mut().as_mut() {
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(w, "[{}] [INFO] closing log file", ts);
            let _ = w.flush();
        }
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    /// True if any event at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.events
            .borrow()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.events.borrow_mut().push((level, message.to_string()));
    }
}

/// Human-readable duration: `12.3s`, `5m 30s`, `2h 15m`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        return format!("{:.1}s", secs);
    }
    let whole = d.as_secs();
    let (minutes, seconds) = (whole / 60, whole % 60);
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}
