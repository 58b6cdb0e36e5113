use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::report::model::SessionReport;
use roadcore::detection::{FeedDocument, FeedEntry};

/// Writes session artifacts under a report path and its sibling log.
pub struct ReportWriter {
    report_path: PathBuf,
    log_path: PathBuf,
}

impl ReportWriter {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        let report_path = report_path.into();
        let log_path = report_path.with_file_name("offline_session.log");
        Self {
            report_path,
            log_path,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn write(&self, report: &SessionReport) -> anyhow::Result<()> {
        ensure_parent(&self.report_path)?;
        let json = serde_json::to_string_pretty(report).context("serializing session report")?;
        fs::write(&self.report_path, json)
            .with_context(|| format!("writing report {}", self.report_path.display()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("opening session log {}", self.log_path.display()))?;
        file.write_all(report.summary_line().as_bytes())?;
        Ok(())
    }
}

/// Writes `batch` as a `{ "detections": [...] }` feed document.
pub fn export_feed(path: &Path, batch: &[FeedEntry]) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let document = FeedDocument {
        detections: batch.to_vec(),
    };
    let json = serde_json::to_string_pretty(&document).context("serializing feed")?;
    fs::write(path, json).with_context(|| format!("writing feed {}", path.display()))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::template::sample_feed;
    use crate::workflow::config::WorkflowConfig;
    use crate::workflow::runner::Runner;
    use roadcore::detection::parse_feed;
    use tempfile::tempdir;

    #[test]
    fn report_and_log_are_written() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested/report.json"));
        let result = Runner::new(WorkflowConfig::default())
            .execute(sample_feed().unwrap())
            .unwrap();
        let report = SessionReport::new("sample", result);

        writer.write(&report).unwrap();
        writer.write(&report).unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("nested/report.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["feed"], "sample");
        assert_eq!(json["load"]["accepted"], 14);

        let log = fs::read_to_string(writer.log_path()).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("accepted=14"));
    }

    #[test]
    fn exported_feed_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.json");
        let batch = sample_feed().unwrap();
        export_feed(&path, &batch).unwrap();
        let again = parse_feed(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(again, batch);
    }
}
