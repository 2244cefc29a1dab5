//! Run orchestration: load, normalize, validate, aggregate, export.
//!
//! A [`Pipeline`] owns the results of its most recent run. `run` needs
//! `&mut self`, so runs against one pipeline can never overlap, and
//! [`Pipeline::spawn`] moves the whole pipeline onto a blocking worker so an
//! interactive caller stays responsive while the run executes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::courses::compute_course_stats;
use crate::error::{PipelineError, Result};
use crate::export::{render_course_csv, render_gpa_csv, write_artifact};
use crate::gpa::compute_gpa;
use crate::loader::load_source;
use crate::models::{AcceptedRecord, CourseStatRow, GpaRow, Rejection};
use crate::run_log::{LogEntry, RunLog};
use crate::schema::{normalize, GroupingKeys};
use crate::validate::validate_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Loading,
    Normalizing,
    Validating,
    Aggregating,
    Done,
    Failed,
}

/// Everything one run produced. Replaced wholesale by the next run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub ok: bool,
    pub message: String,
    #[serde(skip)]
    pub error: Option<PipelineError>,
    pub accepted_records: Vec<AcceptedRecord>,
    pub rejections: Vec<Rejection>,
    pub gpa_keys: GroupingKeys,
    pub gpa_rows: Vec<GpaRow>,
    pub course_keys: GroupingKeys,
    pub course_stats: Vec<CourseStatRow>,
    pub log_entries: Vec<LogEntry>,
}

impl RunResult {
    pub fn total_rows(&self) -> usize {
        self.accepted_records.len() + self.rejections.len()
    }
}

/// State owned by a single in-flight run.
struct RunContext {
    run_id: Uuid,
    source: PathBuf,
    log: RunLog,
    accepted: Vec<AcceptedRecord>,
    rejected: Vec<Rejection>,
    gpa_keys: GroupingKeys,
    gpa_rows: Vec<GpaRow>,
    course_keys: GroupingKeys,
    course_stats: Vec<CourseStatRow>,
}

impl RunContext {
    fn new(source: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.to_path_buf(),
            log: RunLog::new(),
            accepted: Vec::new(),
            rejected: Vec::new(),
            gpa_keys: GroupingKeys::default(),
            gpa_rows: Vec::new(),
            course_keys: GroupingKeys::default(),
            course_stats: Vec::new(),
        }
    }

    fn finish(self, outcome: Result<String>) -> RunResult {
        let (ok, message, error) = match outcome {
            Ok(message) => (true, message, None),
            Err(err) => (false, err.to_string(), Some(err)),
        };
        RunResult {
            run_id: self.run_id,
            source: self.source,
            ok,
            message,
            error,
            accepted_records: self.accepted,
            rejections: self.rejected,
            gpa_keys: self.gpa_keys,
            gpa_rows: self.gpa_rows,
            course_keys: self.course_keys,
            course_stats: self.course_stats,
            log_entries: self.log.into_entries(),
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    state: RunState,
    last_run: Option<RunResult>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
            last_run: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn last_run(&self) -> Option<&RunResult> {
        self.last_run.as_ref()
    }

    pub fn gpa_rows(&self) -> &[GpaRow] {
        self.last_run.as_ref().map_or(&[], |r| r.gpa_rows.as_slice())
    }

    pub fn course_stats(&self) -> &[CourseStatRow] {
        self.last_run.as_ref().map_or(&[], |r| r.course_stats.as_slice())
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        self.last_run.as_ref().map_or(&[], |r| r.log_entries.as_slice())
    }

    /// Runs the pipeline against `source`, discarding any previous results.
    pub fn run(&mut self, source: &Path) -> &RunResult {
        self.last_run = None;
        let mut ctx = RunContext::new(source);
        info!(run_id = %ctx.run_id, source = %source.display(), "Starting run");
        ctx.log.push(format!("Starting process for: {}", source.display()));

        let outcome = self.execute(&mut ctx);
        match &outcome {
            Ok(_) => self.transition(RunState::Done),
            Err(err) => {
                self.transition(RunState::Failed);
                error!(run_id = %ctx.run_id, kind = err.kind(), "{}", err);
                ctx.log.push(format!("Run failed ({}): {}", err.kind(), err));
            }
        }

        // Runs that never reached validation leave the previous log file in place.
        let reached_validation = !matches!(
            outcome,
            Err(PipelineError::Format { .. } | PipelineError::Schema { .. })
        );
        if reached_validation {
            if let Err(err) = ctx.log.flush(&self.config.log_path()) {
                warn!(
                    path = %self.config.log_path().display(),
                    "Could not save log file: {}",
                    err
                );
            }
        }

        self.last_run.insert(ctx.finish(outcome))
    }

    /// Moves the pipeline onto a blocking worker and hands it back when the run completes.
    pub fn spawn(mut self, source: PathBuf) -> JoinHandle<Pipeline> {
        tokio::task::spawn_blocking(move || {
            self.run(&source);
            self
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Pipeline state change");
        self.state = next;
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<String> {
        self.transition(RunState::Loading);
        let raw = load_source(&ctx.source)?;

        self.transition(RunState::Normalizing);
        let normalized = normalize(&raw)?;
        ctx.log.push(format!(
            "Normalized {} columns: {}",
            normalized.schema.columns.len(),
            normalized.schema.columns.join(", ")
        ));

        self.transition(RunState::Validating);
        let report = validate_all(normalized.records);
        for rejection in &report.rejected {
            ctx.log
                .push(format!("Skipping row {}: {}", rejection.row_index, rejection.reason));
        }
        ctx.log.push(format!(
            "Validated {} rows: {} accepted, {} rejected",
            report.total(),
            report.accepted.len(),
            report.rejected.len()
        ));
        let total = report.total();
        ctx.accepted = report.accepted;
        ctx.rejected = report.rejected;

        if ctx.accepted.is_empty() {
            ctx.log.push("Warning: no valid data found after cleaning");
            return Err(PipelineError::EmptyResult { total });
        }

        self.transition(RunState::Aggregating);
        let gpa_keys = normalized.schema.gpa_grouping();
        let course_keys = normalized.schema.course_grouping()?;

        let gpa_rows = compute_gpa(&ctx.accepted, &gpa_keys);
        ctx.log
            .push(format!("Computed GPA for {} student terms", gpa_rows.len()));
        let course_stats = compute_course_stats(&ctx.accepted, &course_keys);
        ctx.log
            .push(format!("Computed statistics for {} courses", course_stats.len()));

        let gpa_csv = render_gpa_csv(&gpa_keys, &gpa_rows)?;
        let course_csv = render_course_csv(&course_keys, &course_stats)?;
        self.write_exports(&gpa_csv, &course_csv)?;
        ctx.log.push(format!(
            "Exports written to {}",
            self.config.output_dir.display()
        ));

        ctx.gpa_keys = gpa_keys;
        ctx.gpa_rows = gpa_rows;
        ctx.course_keys = course_keys;
        ctx.course_stats = course_stats;

        Ok(format!(
            "Processed {} rows: {} accepted, {} rejected",
            total,
            ctx.accepted.len(),
            ctx.rejected.len()
        ))
    }

    fn write_exports(&self, gpa_csv: &[u8], course_csv: &[u8]) -> Result<()> {
        for (path, bytes) in [
            (self.config.gpa_path(), gpa_csv),
            (self.config.course_path(), course_csv),
        ] {
            write_artifact(&path, bytes).map_err(|e| {
                PipelineError::System(format!("failed to write {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn pipeline_in(dir: &TempDir) -> Pipeline {
        Pipeline::new(PipelineConfig::with_output_dir(dir.path()))
    }

    const GOOD_CSV: &str = "\
student_id,term,course_id,course_name,credits,grade
S1,Fall24,CS101,Intro CS,3,A
S1,Fall24,MA201,Calculus,4,B
S2,Fall24,CS101,Intro CS,3,a
S2,Fall24,MA201,Calculus,4,F
S3,Fall24,CS101,Intro CS,3,C
S3,Fall24,CS101,Intro CS,6,A
S4,Fall24,CS101,Intro CS,3,E
";

    #[test]
    fn starts_idle_with_empty_tables() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);
        assert_eq!(pipeline.state(), RunState::Idle);
        assert!(pipeline.gpa_rows().is_empty());
        assert!(pipeline.log_entries().is_empty());
    }

    #[test]
    fn successful_run_produces_tables_and_exports() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "grades.csv", GOOD_CSV);
        let mut pipeline = pipeline_in(&dir);

        let result = pipeline.run(&input);
        assert!(result.ok, "{}", result.message);
        assert_eq!(result.total_rows(), 7);
        assert_eq!(result.accepted_records.len(), 5);
        assert_eq!(result.rejections.len(), 2);
        assert_eq!(result.gpa_rows.len(), 3);
        assert_eq!(result.gpa_rows[0].gpa, 3.43);
        assert_eq!(pipeline.state(), RunState::Done);

        let cs101 = &pipeline.course_stats()[0];
        assert_eq!(cs101.key, vec!["CS101", "Intro CS"]);
        assert_eq!(cs101.enrollment_count, 3);

        assert!(dir.path().join("academic_master_gpa.csv").exists());
        assert!(dir.path().join("academic_stats_by_course.csv").exists());
        let log = fs::read_to_string(dir.path().join("academic_run.log")).unwrap();
        assert!(log.contains("Skipping row 5: credits out of range"));
        assert!(log.contains("Skipping row 6: invalid grade"));
    }

    #[test]
    fn unsupported_extension_fails_at_loading() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "grades.txt", GOOD_CSV);
        let mut pipeline = pipeline_in(&dir);

        let result = pipeline.run(&input);
        assert!(!result.ok);
        assert!(matches!(result.error, Some(PipelineError::Format { .. })));
        assert!(result
            .log_entries
            .last()
            .unwrap()
            .message
            .starts_with("Run failed (FormatError)"));
        assert_eq!(pipeline.state(), RunState::Failed);
        assert!(!dir.path().join("academic_run.log").exists());
    }

    #[test]
    fn failures_leave_previous_exports_untouched() {
        let dir = TempDir::new().unwrap();
        let good = write_input(&dir, "good.csv", GOOD_CSV);
        let no_grade = write_input(&dir, "no_grade.csv", "student_id,term,credits\nS1,Fall24,3\n");
        let all_bad = write_input(
            &dir,
            "all_bad.csv",
            "student_id,term,course_id,credits,grade\nS1,Fall24,CS101,9,A\n",
        );
        let mut pipeline = pipeline_in(&dir);

        assert!(pipeline.run(&good).ok);
        let gpa_before = fs::read(dir.path().join("academic_master_gpa.csv")).unwrap();
        let course_before = fs::read(dir.path().join("academic_stats_by_course.csv")).unwrap();
        let log_before = fs::read(dir.path().join("academic_run.log")).unwrap();

        let schema_failure = pipeline.run(&no_grade);
        assert_eq!(
            schema_failure.error,
            Some(PipelineError::Schema {
                missing: vec!["grade".to_string()]
            })
        );
        assert_eq!(schema_failure.total_rows(), 0);
        assert_eq!(
            fs::read(dir.path().join("academic_run.log")).unwrap(),
            log_before
        );

        let empty_failure = pipeline.run(&all_bad);
        assert!(matches!(
            empty_failure.error,
            Some(PipelineError::EmptyResult { total: 1 })
        ));
        let log_after = fs::read_to_string(dir.path().join("academic_run.log")).unwrap();
        assert!(log_after.contains("Run failed (EmptyResultError)"));

        assert_eq!(
            fs::read(dir.path().join("academic_master_gpa.csv")).unwrap(),
            gpa_before
        );
        assert_eq!(
            fs::read(dir.path().join("academic_stats_by_course.csv")).unwrap(),
            course_before
        );
    }

    #[test]
    fn missing_course_id_is_a_system_error() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "no_course.csv", "student_id,term,credits,grade\nS1,Fall24,3,A\n");
        let mut pipeline = pipeline_in(&dir);

        let result = pipeline.run(&input);
        assert!(!result.ok);
        assert!(matches!(result.error, Some(PipelineError::System(_))));
        assert!(!dir.path().join("academic_master_gpa.csv").exists());
        assert!(result
            .log_entries
            .last()
            .unwrap()
            .message
            .starts_with("Run failed (SystemError)"));
    }

    #[test]
    fn each_run_starts_with_a_fresh_log() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "grades.csv", GOOD_CSV);
        let mut pipeline = pipeline_in(&dir);

        let first_len = pipeline.run(&input).log_entries.len();
        let first_id = pipeline.last_run().unwrap().run_id;
        let second = pipeline.run(&input);

        assert_eq!(second.log_entries.len(), first_len);
        assert_ne!(second.run_id, first_id);
        assert!(second.log_entries[0].message.starts_with("Starting process for"));
    }

    #[tokio::test]
    async fn spawned_run_hands_back_results() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "grades.csv", GOOD_CSV);
        let pipeline = pipeline_in(&dir);

        let pipeline = pipeline.spawn(input).await.unwrap();
        assert_eq!(pipeline.state(), RunState::Done);
        assert_eq!(pipeline.gpa_rows().len(), 3);
    }
}
