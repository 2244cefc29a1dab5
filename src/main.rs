use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gradebook_pipeline::report;
use gradebook_pipeline::{Pipeline, PipelineConfig, RunResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Validate academic records and compute GPA and course statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a CSV or JSON records file and write the exports
    Process {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Directory for the run log and exports (defaults to $GRADEBOOK_OUTPUT_DIR or .)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print the full run result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Process a records file and generate a markdown report
    Report {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn run_pipeline(input: PathBuf, out_dir: Option<PathBuf>) -> anyhow::Result<Pipeline> {
    let config = PipelineConfig::resolve(out_dir.as_deref());
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    Pipeline::new(config)
        .spawn(input)
        .await
        .context("pipeline worker did not complete")
}

fn print_summary(result: &RunResult, limit: usize) {
    println!("{}", result.message);

    if result.gpa_rows.is_empty() {
        return;
    }

    println!("GPA by {}:", result.gpa_keys.names().join(", "));
    for row in result.gpa_rows.iter().take(limit) {
        println!("- {} GPA {:.2}", row.key.join(" / "), row.gpa);
    }

    println!("Courses by {}:", result.course_keys.names().join(", "));
    for row in result.course_stats.iter().take(limit) {
        println!(
            "- {}: {} enrolled, avg {}, pass rate {:.2}, grades {}-{}",
            row.key.join(" / "),
            row.enrollment_count,
            row.avg_grade,
            row.pass_rate,
            row.highest_grade,
            row.lowest_grade
        );
    }
}

fn ensure_ok(pipeline: &Pipeline, result: &RunResult) -> anyhow::Result<()> {
    if !result.ok {
        anyhow::bail!(
            "run failed: {} (see {})",
            result.message,
            pipeline.config().log_path().display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            out_dir,
            limit,
            json,
        } => {
            let pipeline = run_pipeline(input, out_dir).await?;
            let result = pipeline
                .last_run()
                .context("pipeline finished without a run result")?;

            if json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                print_summary(result, limit);
            }
            ensure_ok(&pipeline, result)?;
        }
        Commands::Report {
            input,
            out_dir,
            out,
        } => {
            let pipeline = run_pipeline(input, out_dir).await?;
            let result = pipeline
                .last_run()
                .context("pipeline finished without a run result")?;

            std::fs::write(&out, report::build_report(result))
                .with_context(|| format!("failed to write report {}", out.display()))?;
            println!("Report written to {}.", out.display());
            ensure_ok(&pipeline, result)?;
        }
    }

    Ok(())
}
