use crate::error::RowError;
use crate::models::{AcceptedRecord, CanonicalRecord, Grade, Rejection};

pub const MIN_CREDITS: f64 = 1.0;
pub const MAX_CREDITS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(AcceptedRecord),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub accepted: Vec<AcceptedRecord>,
    pub rejected: Vec<Rejection>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

pub fn validate_record(record: CanonicalRecord) -> Outcome {
    match check(&record) {
        Ok((credits, grade)) => Outcome::Accepted(AcceptedRecord {
            row_index: record.row_index,
            student_id: record.student_id,
            term: record.term,
            credits,
            grade,
            attributes: record.attributes,
        }),
        Err(err) => Outcome::Rejected(Rejection {
            row_index: record.row_index,
            reason: err.to_string(),
        }),
    }
}

fn check(record: &CanonicalRecord) -> Result<(f64, Grade), RowError> {
    let credits = parse_credits(&record.credits)?;
    let grade = Grade::parse(&record.grade)
        .ok_or_else(|| RowError::InvalidGrade(record.grade.trim().to_uppercase()))?;
    Ok((credits, grade))
}

fn parse_credits(value: &str) -> Result<f64, RowError> {
    let out_of_range = || RowError::CreditsOutOfRange(value.trim().to_string());
    let credits: f64 = value.trim().parse().map_err(|_| out_of_range())?;
    if !credits.is_finite() || !(MIN_CREDITS..=MAX_CREDITS).contains(&credits) {
        return Err(out_of_range());
    }
    Ok(credits)
}

/// Validates every record, keeping input order within each partition.
pub fn validate_all(records: Vec<CanonicalRecord>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for record in records {
        match validate_record(record) {
            Outcome::Accepted(accepted) => report.accepted.push(accepted),
            Outcome::Rejected(rejection) => report.rejected.push(rejection),
        }
    }
    report
}
