//! Data models for classbook records.
//!
//! - `SchoolClass`, `Teacher`, `Subject`: school structure
//! - `Week`: teaching weeks of a school year
//! - `TeachingRecord`: periods taught by a teacher in a class for a week

pub mod record;
pub mod school;

use serde::{Deserialize, Deserializer};

pub use record::{total_periods, TeachingRecord};
pub use school::{SchoolClass, Subject, Teacher, Week};

/// Accept ids sent either as strings or as numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Same as [`id_string`] for optional references.
pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    }))
}
