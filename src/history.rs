//! Boundary to the external persistence collaborator. The pipeline hands
//! flat records over and never learns whether they were stored.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Text,
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub user: String,
    pub source_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub kind: RecordKind,
    pub timestamp: String,
}

impl HistoryRecord {
    pub fn new(
        user: impl Into<String>,
        kind: RecordKind,
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            user: user.into(),
            source_text: source_text.into(),
            translated_text: translated_text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            kind,
            timestamp,
        }
    }
}

pub type SinkFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

pub trait HistorySink: Send + Sync {
    fn record(&self, record: HistoryRecord) -> SinkFuture;
}

/// Appends one JSON object per line to a local file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistorySink for JsonlSink {
    fn record(&self, record: HistoryRecord) -> SinkFuture {
        let path = self.path.clone();
        Box::pin(async move {
            let line = serde_json::to_string(&record)
                .with_context(|| "failed to serialize history record")?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open history file {}", path.display()))?;
            writeln!(file, "{line}")
                .with_context(|| format!("failed to append to {}", path.display()))?;
            Ok(())
        })
    }
}

/// Discards every record. Used when history is disabled.
pub struct NullSink;

impl HistorySink for NullSink {
    fn record(&self, _record: HistoryRecord) -> SinkFuture {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryRecord, HistorySink, JsonlSink, RecordKind};

    #[test]
    fn record_serializes_with_flat_shape() {
        let record = HistoryRecord::new("asha", RecordKind::Image, "fever", "बुखार", "en", "hi");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "image");
        assert_eq!(value["source_text"], "fever");
        assert_eq!(value["translated_text"], "बुखार");
        assert_eq!(value["source_language"], "en");
        assert_eq!(value["target_language"], "hi");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let sink = JsonlSink::new(&path);
        sink.record(HistoryRecord::new(
            "asha",
            RecordKind::Text,
            "a",
            "b",
            "en",
            "hi",
        ))
        .await
        .unwrap();
        sink.record(HistoryRecord::new(
            "asha",
            RecordKind::Video,
            "c",
            "d",
            "en",
            "mr",
        ))
        .await
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "video");
    }
}
