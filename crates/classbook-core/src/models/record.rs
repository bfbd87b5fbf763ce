use serde::{Deserialize, Serialize};

use super::{id_string, opt_id_string};

/// Periods a teacher taught one class in one subject during one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingRecord {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "teacherId", deserialize_with = "id_string")]
    pub teacher_id: String,
    #[serde(rename = "classId", deserialize_with = "id_string")]
    pub class_id: String,
    #[serde(rename = "subjectId", default, deserialize_with = "opt_id_string")]
    pub subject_id: Option<String>,
    #[serde(rename = "weekId", deserialize_with = "id_string")]
    pub week_id: String,
    #[serde(default)]
    pub periods: u32,
    #[serde(default)]
    pub lesson: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TeachingRecord {
    pub fn lesson_display(&self) -> &str {
        self.lesson.as_deref().unwrap_or("-")
    }
}

/// Sum of periods across records, e.g. one teacher's week.
pub fn total_periods<'a>(records: impl IntoIterator<Item = &'a TeachingRecord>) -> u32 {
    records.into_iter().map(|r| r.periods).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_teaching_record() {
        let json = r#"{"_id": "r1", "teacherId": 3, "classId": "c9", "weekId": 12, "periods": 4, "lesson": "Bài 5"}"#;
        let record: TeachingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.teacher_id, "3");
        assert_eq!(record.week_id, "12");
        assert_eq!(record.subject_id, None);
        assert_eq!(record.lesson_display(), "Bài 5");
    }

    #[test]
    fn test_total_periods() {
        let json = r#"[
            {"id": "a", "teacherId": "t", "classId": "c", "weekId": "w", "periods": 3},
            {"id": "b", "teacherId": "t", "classId": "d", "weekId": "w", "periods": 2}
        ]"#;
        let records: Vec<TeachingRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(total_periods(&records), 5);
    }
}
