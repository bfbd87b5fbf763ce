use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{id_string, opt_id_string};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub grade: Option<i32>,
    #[serde(rename = "schoolYear", default)]
    pub school_year: Option<String>,
    #[serde(rename = "homeroomTeacherId", default, deserialize_with = "opt_id_string")]
    pub homeroom_teacher_id: Option<String>,
    #[serde(rename = "studentCount", default)]
    pub student_count: Option<u32>,
}

impl SchoolClass {
    pub fn display_student_count(&self) -> String {
        match self.student_count {
            Some(count) => format!("{} students", count),
            None => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "fullName", alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "subjectIds", default)]
    pub subject_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "weekNumber")]
    pub week_number: u32,
    #[serde(rename = "schoolYear", default)]
    pub school_year: Option<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<NaiveDate>,
}

impl Week {
    pub fn date_range(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                format!("{} - {}", start.format("%d/%m"), end.format("%d/%m/%Y"))
            }
            _ => format!("Week {}", self.week_number),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}
