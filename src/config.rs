use std::path::{Path, PathBuf};

pub const OUTPUT_DIR_ENV: &str = "GRADEBOOK_OUTPUT_DIR";

pub const DEFAULT_LOG_FILE: &str = "academic_run.log";
pub const DEFAULT_GPA_FILE: &str = "academic_master_gpa.csv";
pub const DEFAULT_COURSE_FILE: &str = "academic_stats_by_course.csv";

/// Where a run writes its fixed-name artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub log_file: String,
    pub gpa_file: String,
    pub course_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_output_dir(".")
    }
}

impl PipelineConfig {
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            gpa_file: DEFAULT_GPA_FILE.to_string(),
            course_file: DEFAULT_COURSE_FILE.to_string(),
        }
    }

    /// Resolves the output directory from an explicit override, then
    /// `GRADEBOOK_OUTPUT_DIR`, then the current directory.
    pub fn resolve(output_dir: Option<&Path>) -> Self {
        match output_dir {
            Some(dir) => Self::with_output_dir(dir),
            None => std::env::var(OUTPUT_DIR_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(Self::with_output_dir)
                .unwrap_or_default(),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_file)
    }

    pub fn gpa_path(&self) -> PathBuf {
        self.output_dir.join(&self.gpa_file)
    }

    pub fn course_path(&self) -> PathBuf {
        self.output_dir.join(&self.course_file)
    }
}
