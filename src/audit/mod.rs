//! Audit collaborator.
//!
//! Best-effort activity and error trail. Recording never blocks the caller
//! and never fails: file writes happen on a background task and their
//! errors only reach the tracing output.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::AuditConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Activity,
    Error,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub level: AuditLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn now(level: AuditLevel, message: String) -> Self {
        Self {
            level,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Log file line, newline terminated.
    pub fn to_line(&self) -> String {
        match self.level {
            AuditLevel::Activity => format!("[{}] {}\n", self.timestamp.to_rfc3339(), self.message),
            AuditLevel::Error => format!("[{}] ERROR: {}\n", self.timestamp.to_rfc3339(), self.message),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);

    fn activity(&self, message: String) {
        self.record(AuditEntry::now(AuditLevel::Activity, message));
    }

    fn error(&self, message: String) {
        self.record(AuditEntry::now(AuditLevel::Error, message));
    }
}

/// Appends entries to the activity and error log files.
pub struct FileAuditLog {
    sender: mpsc::UnboundedSender<AuditEntry>,
}

impl FileAuditLog {
    /// Starts the writer task. Must be called from within a tokio runtime.
    pub fn spawn(config: &AuditConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(write_entries(
            receiver,
            PathBuf::from(&config.activity_log),
            PathBuf::from(&config.error_log),
        ));
        Self { sender }
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, entry: AuditEntry) {
        match entry.level {
            AuditLevel::Activity => info!(target: "audit", "{}", entry.message),
            AuditLevel::Error => error!(target: "audit", "{}", entry.message),
        }
        // Writer gone means we are shutting down; the entry is already in tracing.
        let _ = self.sender.send(entry);
    }
}

async fn write_entries(
    mut receiver: mpsc::UnboundedReceiver<AuditEntry>,
    activity_log: PathBuf,
    error_log: PathBuf,
) {
    while let Some(entry) = receiver.recv().await {
        let path = match entry.level {
            AuditLevel::Activity => &activity_log,
            AuditLevel::Error => &error_log,
        };
        if let Err(e) = append_line(path, &entry.to_line()).await {
            warn!("Failed to write audit entry to {}: {}", path.display(), e);
        }
    }
}

async fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Keeps entries in memory.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: AuditLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}
