use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::models::{CourseStatRow, GpaRow};
use crate::pipeline::RunResult;
use crate::schema::GroupingKeys;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentBar {
    pub label: String,
    pub enrollment_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GpaDistribution {
    pub below_3: usize,
    pub from_3_to_3_49: usize,
    pub from_3_5_to_3_99: usize,
    pub perfect: usize,
}

impl GpaDistribution {
    pub fn buckets(&self) -> [(&'static str, usize); 4] {
        [
            ("< 3.0", self.below_3),
            ("3.0 - 3.49", self.from_3_to_3_49),
            ("3.5 - 3.99", self.from_3_5_to_3_99),
            ("4.0", self.perfect),
        ]
    }
}

/// Courses ordered by enrollment, largest first, labelled by name when available.
pub fn top_enrollment(keys: &GroupingKeys, stats: &[CourseStatRow], limit: usize) -> Vec<EnrollmentBar> {
    let label_index = keys.position("course_name").or_else(|| keys.position("course_id"));

    let mut ordered: Vec<&CourseStatRow> = stats.iter().collect();
    ordered.sort_by(|a, b| {
        b.enrollment_count
            .cmp(&a.enrollment_count)
            .then_with(|| a.key.cmp(&b.key))
    });

    ordered
        .into_iter()
        .take(limit)
        .map(|row| EnrollmentBar {
            label: label_index
                .and_then(|i| row.key.get(i).cloned())
                .unwrap_or_default(),
            enrollment_count: row.enrollment_count,
        })
        .collect()
}

pub fn gpa_distribution(rows: &[GpaRow]) -> GpaDistribution {
    let mut distribution = GpaDistribution::default();
    for row in rows {
        match row.gpa {
            g if g < 3.0 => distribution.below_3 += 1,
            g if g < 3.5 => distribution.from_3_to_3_49 += 1,
            g if g < 4.0 => distribution.from_3_5_to_3_99 += 1,
            _ => distribution.perfect += 1,
        }
    }
    distribution
}

/// Mean course pass rate per department. Empty when there is no department column.
pub fn pass_rate_by_department(keys: &GroupingKeys, stats: &[CourseStatRow]) -> Vec<(String, f64)> {
    let Some(index) = keys.position("department") else {
        return Vec::new();
    };

    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in stats {
        let department = row.key.get(index).cloned().unwrap_or_default();
        let entry = totals.entry(department).or_insert((0.0, 0));
        entry.0 += row.pass_rate;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(department, (sum, count))| (department, sum / count as f64))
        .collect()
}

pub fn build_report(result: &RunResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Records Report");
    let _ = writeln!(
        output,
        "Generated from {} (run {})",
        result.source.display(),
        result.run_id
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Run Summary");
    let _ = writeln!(
        output,
        "- Status: {}",
        if result.ok { "success" } else { "failed" }
    );
    let _ = writeln!(output, "- {}", result.message);
    let _ = writeln!(
        output,
        "- Rows: {} total, {} accepted, {} rejected",
        result.total_rows(),
        result.accepted_records.len(),
        result.rejections.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## GPA Distribution");

    if result.gpa_rows.is_empty() {
        let _ = writeln!(output, "No GPA results for this run.");
    } else {
        for (label, count) in gpa_distribution(&result.gpa_rows).buckets() {
            let _ = writeln!(output, "- {}: {} student terms", label, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Courses by Enrollment");

    let bars = top_enrollment(&result.course_keys, &result.course_stats, 10);
    if bars.is_empty() {
        let _ = writeln!(output, "No course statistics for this run.");
    } else {
        for bar in bars {
            let _ = writeln!(output, "- {}: {} enrolled", bar.label, bar.enrollment_count);
        }
    }

    let departments = pass_rate_by_department(&result.course_keys, &result.course_stats);
    if !departments.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Pass Rate by Department");
        for (department, rate) in departments {
            let _ = writeln!(output, "- {}: {:.0}%", department, rate * 100.0);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skipped Rows");

    if result.rejections.is_empty() {
        let _ = writeln!(output, "No rows were skipped.");
    } else {
        for rejection in result.rejections.iter().take(10) {
            let _ = writeln!(output, "- Row {}: {}", rejection.row_index, rejection.reason);
        }
        if result.rejections.len() > 10 {
            let _ = writeln!(output, "- ... and {} more", result.rejections.len() - 10);
        }
    }

    output
}
