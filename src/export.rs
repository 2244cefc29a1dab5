//! CSV rendering and persistence of the result tables.
//!
//! Tables are rendered to memory first so a failed render never leaves a
//! half-written artifact behind.

use std::path::Path;

use csv::Writer;
use tracing::debug;

use crate::error::AggregateError;
use crate::models::{CourseStatRow, GpaRow};
use crate::schema::GroupingKeys;

pub const COURSE_STAT_COLUMNS: [&str; 5] = [
    "enrollment_count",
    "avg_grade",
    "pass_rate",
    "highest_grade",
    "lowest_grade",
];

fn render_error(artifact: &str, err: impl ToString) -> AggregateError {
    AggregateError::Render {
        artifact: artifact.to_string(),
        reason: err.to_string(),
    }
}

fn finish(artifact: &str, writer: Writer<Vec<u8>>) -> Result<Vec<u8>, AggregateError> {
    writer.into_inner().map_err(|e| render_error(artifact, e))
}

pub fn render_gpa_csv(keys: &GroupingKeys, rows: &[GpaRow]) -> Result<Vec<u8>, AggregateError> {
    const ARTIFACT: &str = "GPA export";
    let mut writer = Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = keys.names().iter().map(String::as_str).collect();
    header.push("GPA");
    writer
        .write_record(&header)
        .map_err(|e| render_error(ARTIFACT, e))?;

    for row in rows {
        let mut record = row.key.clone();
        record.push(format!("{:.2}", row.gpa));
        writer
            .write_record(&record)
            .map_err(|e| render_error(ARTIFACT, e))?;
    }

    finish(ARTIFACT, writer)
}

pub fn render_course_csv(
    keys: &GroupingKeys,
    rows: &[CourseStatRow],
) -> Result<Vec<u8>, AggregateError> {
    const ARTIFACT: &str = "course statistics export";
    let mut writer = Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = keys.names().iter().map(String::as_str).collect();
    header.extend(COURSE_STAT_COLUMNS);
    writer
        .write_record(&header)
        .map_err(|e| render_error(ARTIFACT, e))?;

    for row in rows {
        let mut record = row.key.clone();
        record.push(row.enrollment_count.to_string());
        record.push(row.avg_grade.to_string());
        record.push(format!("{:.2}", row.pass_rate));
        record.push(row.highest_grade.to_string());
        record.push(row.lowest_grade.to_string());
        writer
            .write_record(&record)
            .map_err(|e| render_error(ARTIFACT, e))?;
    }

    finish(ARTIFACT, writer)
}

/// Overwrites `path` with already-rendered bytes.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    debug!(path = %path.display(), bytes = bytes.len(), "Writing export");
    std::fs::write(path, bytes)
}
