use std::collections::{BTreeSet, HashMap};

use crate::gpa::group_key;
use crate::models::{round2, AcceptedRecord, CourseStatRow, Grade};
use crate::schema::GroupingKeys;

/// Maps a mean grade-point value onto a letter.
///
/// | Mean points | Letter |
/// |-------------|--------|
/// | >= 3.5      | A      |
/// | >= 2.5      | B      |
/// | >= 1.5      | C      |
/// | >= 0.5      | D      |
/// | < 0.5       | F      |
pub fn letter_for_points(avg: f64) -> Grade {
    match avg {
        p if p >= 3.5 => Grade::A,
        p if p >= 2.5 => Grade::B,
        p if p >= 1.5 => Grade::C,
        p if p >= 0.5 => Grade::D,
        _ => Grade::F,
    }
}

pub fn compute_course_stats(records: &[AcceptedRecord], keys: &GroupingKeys) -> Vec<CourseStatRow> {
    let mut groups: HashMap<Vec<String>, Vec<Grade>> = HashMap::new();

    for record in records {
        groups
            .entry(group_key(record, keys))
            .or_default()
            .push(record.grade);
    }

    let mut rows: Vec<CourseStatRow> = groups
        .into_iter()
        .filter_map(|(key, grades)| summarize(key, &grades))
        .collect();

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

fn summarize(key: Vec<String>, grades: &[Grade]) -> Option<CourseStatRow> {
    // Extremes come from the alphabetically sorted set of distinct letters.
    let distinct: BTreeSet<Grade> = grades.iter().copied().collect();
    let highest_grade = *distinct.first()?;
    let lowest_grade = *distinct.last()?;

    let count = grades.len();
    let avg_points = grades.iter().map(|g| g.points()).sum::<f64>() / count as f64;
    let passed = grades.iter().filter(|g| g.is_passing()).count();

    Some(CourseStatRow {
        key,
        enrollment_count: count,
        avg_grade: letter_for_points(avg_points),
        pass_rate: round2(passed as f64 / count as f64),
        highest_grade,
        lowest_grade,
    })
}
