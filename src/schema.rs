//! Column-name normalization onto the canonical record schema.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::{AggregateError, PipelineError, Result};
use crate::loader::RawTable;
use crate::models::CanonicalRecord;

pub const REQUIRED_COLUMNS: [&str; 4] = ["student_id", "term", "credits", "grade"];

/// Ordered alias table: for each canonical field, the source names tried in
/// order. The first one present is renamed; otherwise the canonical name passes through.
pub const ALIASES: [(&str, &[&str]); 4] = [
    ("term", &["academic_term", "period"]),
    ("student_id", &["student_no", "id"]),
    ("course_id", &["course_code"]),
    ("student_name", &["full_name", "name"]),
];

const GPA_OPTIONAL_KEYS: [&str; 3] = ["student_name", "major", "campus"];
const COURSE_OPTIONAL_KEYS: [&str; 2] = ["course_name", "department"];

/// The normalized column set for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub columns: Vec<String>,
}

impl Schema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// `student_id, term` plus whichever of `student_name, major, campus` exist.
    pub fn gpa_grouping(&self) -> GroupingKeys {
        let mut keys = vec!["student_id".to_string(), "term".to_string()];
        keys.extend(
            GPA_OPTIONAL_KEYS
                .iter()
                .filter(|k| self.has_column(k))
                .map(|k| k.to_string()),
        );
        GroupingKeys(keys)
    }

    /// `course_id` plus whichever of `course_name, department` exist.
    pub fn course_grouping(&self) -> std::result::Result<GroupingKeys, AggregateError> {
        if !self.has_column("course_id") {
            return Err(AggregateError::MissingGroupingColumn(
                "course_id".to_string(),
            ));
        }
        let mut keys = vec!["course_id".to_string()];
        keys.extend(
            COURSE_OPTIONAL_KEYS
                .iter()
                .filter(|k| self.has_column(k))
                .map(|k| k.to_string()),
        );
        Ok(GroupingKeys(keys))
    }
}

/// Column names an aggregation partitions by, decided once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingKeys(pub Vec<String>);

impl GroupingKeys {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|k| k == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// Lowercases, trims and replaces each space with an underscore.
pub fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Output of normalization: the schema plus one canonical record per raw row.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    pub schema: Schema,
    pub records: Vec<CanonicalRecord>,
}

pub fn normalize(table: &RawTable) -> Result<NormalizedTable> {
    // Maps each kept source column index to its final canonical name.
    let mut names: Vec<Option<String>> = Vec::with_capacity(table.columns.len());
    for raw in &table.columns {
        let name = normalize_header(raw);
        if names.iter().flatten().any(|existing| *existing == name) {
            warn!(column = %name, "Duplicate column after normalization, keeping first");
            names.push(None);
        } else {
            names.push(Some(name));
        }
    }

    for (canonical, aliases) in ALIASES {
        let Some(alias_index) = aliases.iter().find_map(|alias| {
            names
                .iter()
                .position(|n| n.as_deref() == Some(*alias))
        }) else {
            continue;
        };

        if let Some(shadowed) = names
            .iter()
            .position(|n| n.as_deref() == Some(canonical))
        {
            warn!(
                column = canonical,
                "Aliased column replaces an existing column of the same name"
            );
            names[shadowed] = None;
        }
        names[alias_index] = Some(canonical.to_string());
    }

    let columns: Vec<String> = names.iter().flatten().cloned().collect();
    let schema = Schema { columns };

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !schema.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| canonical_record(row_index, &names, row))
        .collect();

    Ok(NormalizedTable { schema, records })
}

fn canonical_record(row_index: usize, names: &[Option<String>], row: &[String]) -> CanonicalRecord {
    let mut record = CanonicalRecord {
        row_index,
        student_id: String::new(),
        term: String::new(),
        credits: String::new(),
        grade: String::new(),
        attributes: BTreeMap::new(),
    };

    for (name, value) in names.iter().zip(row) {
        let Some(name) = name else { continue };
        let value = value.clone();
        match name.as_str() {
            "student_id" => record.student_id = value,
            "term" => record.term = value,
            "credits" => record.credits = value,
            "grade" => record.grade = value,
            _ => {
                record.attributes.insert(name.clone(), value);
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn header_normalization_matches_expected_forms() {
        assert_eq!(normalize_header("  Student ID "), "student_id");
        assert_eq!(normalize_header("Course  Name"), "course__name");
        assert_eq!(normalize_header("\u{feff}Grade"), "grade");
    }

    #[test]
    fn aliases_map_to_canonical_names() {
        let aliased = table(
            &["period", "student_no", "course_code", "full_name", "credits", "grade"],
            &[&["Fall24", "S1", "CS101", "Avery Lee", "3", "A"]],
        );
        let canonical = table(
            &["term", "student_id", "course_id", "student_name", "credits", "grade"],
            &[&["Fall24", "S1", "CS101", "Avery Lee", "3", "A"]],
        );

        let a = normalize(&aliased).unwrap();
        let b = normalize(&canonical).unwrap();
        assert_eq!(a.schema, b.schema);
        assert_eq!(a.records, b.records);
        assert_eq!(a.records[0].attributes["course_id"], "CS101");
    }

    #[test]
    fn first_alias_wins() {
        let t = table(
            &["academic_term", "period", "id", "credits", "grade"],
            &[&["Spring25", "P1", "S9", "4", "b"]],
        );
        let normalized = normalize(&t).unwrap();
        let record = &normalized.records[0];

        assert_eq!(record.term, "Spring25");
        assert_eq!(record.student_id, "S9");
        assert_eq!(record.attributes["period"], "P1");
    }

    #[test]
    fn alias_shadows_existing_canonical_column() {
        let t = table(
            &["term", "academic_term", "student_id", "credits", "grade"],
            &[&["old", "new", "S1", "3", "A"]],
        );
        let normalized = normalize(&t).unwrap();

        assert_eq!(normalized.records[0].term, "new");
        assert_eq!(
            normalized.schema.columns.iter().filter(|c| *c == "term").count(),
            1
        );
    }

    #[test]
    fn extra_columns_are_preserved_verbatim() {
        let t = table(
            &["Student ID", "Term", "Credits", "Grade", "Advisor"],
            &[&["S1", "Fall24", "3", "A", " Dr. Kim "]],
        );
        let normalized = normalize(&t).unwrap();
        assert_eq!(normalized.records[0].attributes["advisor"], " Dr. Kim ");
    }

    #[test]
    fn missing_required_columns_fail_the_whole_load() {
        let t = table(
            &["student_id", "term", "credits"],
            &[&["S1", "Fall24", "3"], &["S2", "Fall24", "4"]],
        );
        match normalize(&t) {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing, vec!["grade"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn grouping_keys_follow_schema() {
        let schema = Schema {
            columns: ["student_id", "term", "credits", "grade", "campus", "course_id", "department"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        };

        assert_eq!(schema.gpa_grouping().names(), ["student_id", "term", "campus"]);
        assert_eq!(
            schema.course_grouping().unwrap().names(),
            ["course_id", "department"]
        );
    }

    #[test]
    fn course_grouping_requires_course_id() {
        let schema = Schema {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        };
        assert!(matches!(
            schema.course_grouping(),
            Err(AggregateError::MissingGroupingColumn(_))
        ));
    }
}
