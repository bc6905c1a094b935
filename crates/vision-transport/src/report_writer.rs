//! Writes the learn-mode report to `data/report_<session>.json`, alongside
//! (not instead of) the `post_learn_report` transport call.

use std::fs;
use std::path::{Path, PathBuf};

use vision_proto::report::LearnReport;

use crate::error::TransportError;

pub fn write_report(data_dir: &Path, session_id: &str, report: &LearnReport) -> Result<PathBuf, TransportError> {
    fs::create_dir_all(data_dir)?;
    let path = data_dir.join(format!("report_{session_id}.json"));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision_proto::report::LearnReportBuilder;

    #[test]
    fn writes_report_to_the_documented_filename() {
        let dir = std::env::temp_dir().join("vision-transport-test-report-writer");
        let report = LearnReportBuilder::new("sess-7", "racer-1").finish();
        let path = write_report(&dir, "sess-7", &report).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "report_sess-7.json");
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
