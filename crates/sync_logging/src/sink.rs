use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MARKER: &str = "==================================================";

/// One structured line written by the [`EventSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogRecord {
    /// RFC 3339 timestamp taken when the record was created.
    pub timestamp: String,
    /// `info`, `warn` or `error`.
    pub level: String,
    /// Component that produced the record, e.g. `proxy` or `schedule`.
    pub scope: String,
    /// Human readable message. Callers must sanitize it first.
    pub message: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl SyncLogRecord {
    /// Builds a record stamped with the current time.
    pub fn new(level: &str, scope: &str, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            scope: scope.to_string(),
            message: message.into(),
            context: None,
        }
    }

    /// Attaches a structured payload.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Fire-and-forget JSON-lines side channel.
///
/// Records are handed to a background writer thread over a channel, so
/// [`EventSink::record`] never blocks on IO and never reports failure. Write
/// errors are logged once through the `log` facade and otherwise dropped.
pub struct EventSink {
    tx: Option<mpsc::Sender<SyncLogRecord>>,
    worker: Option<JoinHandle<()>>,
}

impl EventSink {
    /// A sink that discards every record.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
        }
    }

    /// Appends records to `path`, creating the file if needed.
    ///
    /// Falls back to [`EventSink::disabled`] when the file cannot be opened.
    pub fn to_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("Event log {:?} unavailable: {}", path, err);
                return Self::disabled();
            }
        };

        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || write_loop(path, file, rx));
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Whether records are actually written anywhere.
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues a record. Never blocks, never fails.
    pub fn record(&self, record: SyncLogRecord) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(record);
        }
    }

    /// Convenience for an info record without context.
    pub fn info(&self, scope: &str, message: impl Into<String>) {
        self.record(SyncLogRecord::new("info", scope, message));
    }

    /// Convenience for an error record without context.
    pub fn error(&self, scope: &str, message: impl Into<String>) {
        self.record(SyncLogRecord::new("error", scope, message));
    }

    /// Writes the banner that opens a sync run.
    pub fn sync_started(&self, kind: &str) {
        self.info("sync", MARKER);
        self.info(
            "sync",
            format!("SYNC STARTED - Type: {kind} - {}", Utc::now().to_rfc3339()),
        );
        self.info("sync", MARKER);
    }

    /// Writes the banner that closes a sync run, with its counters.
    pub fn sync_finished(&self, status: &str, counters: Value) {
        self.info("sync", MARKER);
        self.record(
            SyncLogRecord::new("info", "sync", format!("SYNC COMPLETED - Status: {status}"))
                .with_context(counters),
        );
        self.info("sync", MARKER);
    }

    /// Closes the channel and waits for queued records to reach the file.
    ///
    /// Dropping the sink has the same effect.
    pub fn shutdown(mut self) {
        self.drain();
    }

    fn drain(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EventSink {
    fn drop(&mut self) {
        self.drain();
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::disabled()
    }
}

fn write_loop(path: PathBuf, file: File, rx: mpsc::Receiver<SyncLogRecord>) {
    let mut writer = BufWriter::new(file);
    let mut failed = false;
    while let Ok(record) = rx.recv() {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(_) => continue,
        };
        let result = writeln!(writer, "{line}").and_then(|_| writer.flush());
        if let Err(err) = result {
            if !failed {
                log::warn!("Event log {:?} write failed: {}", path, err);
                failed = true;
            }
        }
    }
}
