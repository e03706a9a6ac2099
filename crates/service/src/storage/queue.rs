use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::info;

use crate::errors::ServiceError;

/// One line of the queue log: `<RFC 3339 timestamp>\t<body>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueMessage {
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

impl QueueMessage {
    pub fn new(body: &str) -> Self {
        // one message per line
        let body = body.replace(['\r', '\n'], " ");
        Self { timestamp: Utc::now(), body }
    }

    pub fn to_line(&self) -> String {
        format!("{}\t{}\n", self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true), self.body)
    }

    /// Parse a log line back into its parts; `None` if the timestamp is unreadable.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (ts, body) = line.split_once('\t')?;
        let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
        Some(Self { timestamp, body: body.to_string() })
    }
}

/// Queue emulation: an append-only, unbounded UTF-8 log with no consumer.
#[derive(Debug)]
pub struct MessageQueue {
    log_path: PathBuf,
    append: Mutex<()>,
}

impl MessageQueue {
    pub fn new<P: Into<PathBuf>>(log_path: P) -> Self {
        Self { log_path: log_path.into(), append: Mutex::new(()) }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one message; returns what was written.
    pub async fn send(&self, body: &str) -> Result<QueueMessage, ServiceError> {
        let _guard = self.append.lock().await;
        let msg = QueueMessage::new(body);
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.log_path).await?;
        file.write_all(msg.to_line().as_bytes()).await?;
        file.flush().await?;
        info!(queue = "queue.log", body = %msg.body, "message sent");
        Ok(msg)
    }
}
