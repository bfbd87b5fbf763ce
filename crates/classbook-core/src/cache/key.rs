use std::fmt;

/// Server collections that are read through the cache. Each one is its own
/// invalidation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Classes,
    Teachers,
    Subjects,
    Weeks,
    TeachingRecords,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Classes,
        Resource::Teachers,
        Resource::Subjects,
        Resource::Weeks,
        Resource::TeachingRecords,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Classes => "classes",
            Resource::Teachers => "teachers",
            Resource::Subjects => "subjects",
            Resource::Weeks => "weeks",
            Resource::TeachingRecords => "teaching-records",
        }
    }

    /// Collection path relative to the API base URL.
    pub fn path(&self) -> String {
        format!("/{}", self.name())
    }

    /// Path of a single record in the collection.
    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.name(), id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The view scope a list was fetched under. Field order is significant for
/// the query string; equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeParams {
    pub school_year: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filter_field: Option<String>,
    pub filter_value: Option<String>,
}

impl ScopeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn school_year(mut self, year: impl Into<String>) -> Self {
        self.school_year = Some(year.into());
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter_field = Some(field.into());
        self.filter_value = Some(value.into());
        self
    }

    /// Query pairs for the list endpoint. A filter is only sent when both its
    /// field and value are set.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(ref year) = self.school_year {
            query.push(("schoolYear".to_string(), year.clone()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.page_size {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let (Some(field), Some(value)) = (&self.filter_field, &self.filter_value) {
            if !field.is_empty() && !value.is_empty() {
                query.push((field.clone(), value.clone()));
            }
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource: Resource,
    pub scope: ScopeParams,
}

impl CacheKey {
    pub fn new(resource: Resource, scope: ScopeParams) -> Self {
        Self { resource, scope }
    }
}
