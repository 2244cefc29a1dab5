use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Letter grades in letter order. `Ord` is alphabetical, which is what the
/// course extremes are computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// Parses a grade letter, ignoring surrounding whitespace and case.
    pub fn parse(value: &str) -> Option<Grade> {
        match value.trim().to_uppercase().as_str() {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }

    pub fn points(self) -> f64 {
        match self {
            Grade::A => 4.0,
            Grade::B => 3.0,
            Grade::C => 2.0,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    pub fn is_passing(self) -> bool {
        !matches!(self, Grade::F)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub row_index: usize,
    pub student_id: String,
    pub term: String,
    pub credits: String,
    pub grade: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedRecord {
    pub row_index: usize,
    pub student_id: String,
    pub term: String,
    pub credits: f64,
    pub grade: Grade,
    pub attributes: BTreeMap<String, String>,
}

impl AcceptedRecord {
    /// Looks up a grouping field by its canonical column name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "student_id" => Some(&self.student_id),
            "term" => Some(&self.term),
            _ => self.attributes.get(name).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub row_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaRow {
    pub key: Vec<String>,
    pub gpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseStatRow {
    pub key: Vec<String>,
    pub enrollment_count: usize,
    pub avg_grade: Grade,
    pub pass_rate: f64,
    pub highest_grade: Grade,
    pub lowest_grade: Grade,
}

/// Rounds to two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grades_case_insensitively() {
        assert_eq!(Grade::parse(" b "), Some(Grade::B));
        assert_eq!(Grade::parse("f"), Some(Grade::F));
        assert_eq!(Grade::parse("E"), None);
        assert_eq!(Grade::parse(""), None);
        assert_eq!(Grade::parse("A+"), None);
    }

    #[test]
    fn grade_points_follow_fixed_table() {
        let points: Vec<f64> = Grade::ALL.iter().map(|g| g.points()).collect();
        assert_eq!(points, vec![4.0, 3.0, 2.0, 1.0, 0.0]);
        assert!(Grade::D.is_passing());
        assert!(!Grade::F.is_passing());
    }

    #[test]
    fn grade_order_is_alphabetical() {
        let mut grades = vec![Grade::F, Grade::C, Grade::A, Grade::D];
        grades.sort();
        assert_eq!(grades, vec![Grade::A, Grade::C, Grade::D, Grade::F]);
    }

    #[test]
    fn field_lookup_covers_required_and_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert("major".to_string(), "Biology".to_string());
        let record = AcceptedRecord {
            row_index: 0,
            student_id: "S1".to_string(),
            term: "Fall24".to_string(),
            credits: 3.0,
            grade: Grade::A,
            attributes,
        };

        assert_eq!(record.field("student_id"), Some("S1"));
        assert_eq!(record.field("term"), Some("Fall24"));
        assert_eq!(record.field("major"), Some("Biology"));
        assert_eq!(record.field("campus"), None);
    }

    #[test]
    fn round2_rounds_ties_to_even() {
        assert_eq!(round2(2.125), 2.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(24.0 / 7.0), 3.43);
        assert_eq!(round2(0.75), 0.75);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }
}
