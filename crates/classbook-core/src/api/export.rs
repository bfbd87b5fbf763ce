//! Binary report downloads.

use percent_encoding::percent_decode_str;
use reqwest::header;

use super::request::ApiRequest;
use super::{ApiClient, ApiError};

/// Teaching-record report endpoint.
pub const TEACHING_REPORT_PATH: &str = "/reports/teaching-records/export";

/// Used when the server sends no usable `Content-Disposition` filename.
pub const DEFAULT_REPORT_FILENAME: &str = "teaching-report.xlsx";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportParams {
    pub school_year: String,
    pub teacher_id: Option<String>,
    pub from_week: Option<u32>,
    pub to_week: Option<u32>,
}

impl ExportParams {
    pub fn new(school_year: impl Into<String>) -> Self {
        Self {
            school_year: school_year.into(),
            ..Self::default()
        }
    }

    pub fn teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    pub fn weeks(mut self, from: u32, to: u32) -> Self {
        self.from_week = Some(from);
        self.to_week = Some(to);
        self
    }

    /// Checked before any request is issued.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.school_year.trim().is_empty() {
            return Err(ApiError::Validation(
                "A school year is required to export a report".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.from_week, self.to_week) {
            if from > to {
                return Err(ApiError::Validation(format!(
                    "Week range is reversed: {} > {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("schoolYear".to_string(), self.school_year.trim().to_string())];
        if let Some(ref teacher) = self.teacher_id {
            query.push(("teacherId".to_string(), teacher.clone()));
        }
        if let Some(from) = self.from_week {
            query.push(("fromWeek".to_string(), from.to_string()));
        }
        if let Some(to) = self.to_week {
            query.push(("toWeek".to_string(), to.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    /// Send a request whose successful response is a file.
    pub async fn download(&self, request: ApiRequest) -> Result<ExportFile, ApiError> {
        let response = self.send(request).await?;
        let headers = response.headers();
        let filename = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(ExportFile {
            filename,
            content_type,
            bytes,
        })
    }
}

/// Prefer the RFC 5987 `filename*=` form over plain `filename=`.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';').map(str::trim) {
        let Some((name, raw)) = part.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'percent-encoded
                let encoded = raw.trim().splitn(3, '\'').nth(2).unwrap_or(raw.trim());
                let decoded = percent_decode_str(encoded.trim_matches('"'))
                    .decode_utf8()
                    .ok()
                    .map(|s| s.into_owned());
                extended = decoded.filter(|s| !s.is_empty());
            }
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }

    extended.or(plain)
}
