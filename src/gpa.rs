use std::collections::HashMap;

use crate::models::{round2, AcceptedRecord, GpaRow};
use crate::schema::GroupingKeys;

#[derive(Debug, Default)]
struct GpaAccumulator {
    quality_points: f64,
    total_credits: f64,
}

/// Builds the grouping tuple for a record. Absent optional values group as "".
pub fn group_key(record: &AcceptedRecord, keys: &GroupingKeys) -> Vec<String> {
    keys.names()
        .iter()
        .map(|name| record.field(name).unwrap_or_default().to_string())
        .collect()
}

/// Credit-weighted GPA per grouping tuple, sorted by key.
pub fn compute_gpa(records: &[AcceptedRecord], keys: &GroupingKeys) -> Vec<GpaRow> {
    let mut groups: HashMap<Vec<String>, GpaAccumulator> = HashMap::new();

    for record in records {
        let entry = groups.entry(group_key(record, keys)).or_default();
        entry.quality_points += record.grade.points() * record.credits;
        entry.total_credits += record.credits;
    }

    let mut rows: Vec<GpaRow> = groups
        .into_iter()
        .map(|(key, acc)| GpaRow {
            key,
            gpa: weighted_average(acc.quality_points, acc.total_credits),
        })
        .collect();

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

pub fn weighted_average(quality_points: f64, total_credits: f64) -> f64 {
    if total_credits > 0.0 {
        round2(quality_points / total_credits)
    } else {
        0.0
    }
}
