//! The `{code, msg, data}` response envelope and list payload shapes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ApiError;

/// Envelope codes at or above this value report a failure even on a 2xx response.
const FIRST_FAILURE_CODE: i64 = 400;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: Option<i64>,
    #[serde(alias = "message")]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Split the envelope into its data, failing on an error code.
    pub fn into_data(self) -> Result<Option<T>, ApiError> {
        match self.code {
            Some(code) if code >= FIRST_FAILURE_CODE => Err(ApiError::Api {
                code,
                message: self.msg.unwrap_or_default(),
            }),
            _ => Ok(self.data),
        }
    }

    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

/// One page of records as returned to callers. Cloning shares the records.
#[derive(Debug)]
pub struct Page<T> {
    pub records: Arc<Vec<T>>,
    pub pagination: Option<Pagination>,
}

impl<T> Clone for Page<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            pagination: self.pagination,
        }
    }
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self {
            records: Arc::new(records),
            pagination,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }
}

/// List endpoints answer with either a bare array or a wrapper object that
/// names its record array after the resource.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(
            alias = "data",
            alias = "records",
            alias = "classes",
            alias = "teachers",
            alias = "subjects",
            alias = "weeks",
            alias = "teachingRecords"
        )]
        items: Vec<T>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

impl<T> ListPayload<T> {
    pub(crate) fn into_page(self) -> Page<T> {
        match self {
            ListPayload::Bare(items) => Page::new(items, None),
            ListPayload::Wrapped { items, pagination } => Page::new(items, pagination),
        }
    }
}
