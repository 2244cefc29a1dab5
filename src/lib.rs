//! Academic records pipeline: ingests a CSV or JSON gradebook, validates it,
//! and computes per-student GPA and per-course statistics.

pub mod config;
pub mod courses;
pub mod error;
pub mod export;
pub mod gpa;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod run_log;
pub mod schema;
pub mod validate;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunResult, RunState};
