//! Common API types and utilities
//!
//! The pagination request, the generic resource-set container, and the
//! update-mode switch shared by every resource service.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::error::{PlatformError, Result};

mod string_or_number {
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(u64),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Pagination window, 1-based.
///
/// Embedded by value in every resource query request. `validate` must pass
/// before `skip`/`limit` are used; zero values would otherwise produce a
/// negative skip.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// Page number, starting at 1
    #[serde(default, deserialize_with = "string_or_number::deserialize_u64_opt")]
    pub page_number: Option<u64>,

    /// Items per page
    #[serde(default, deserialize_with = "string_or_number::deserialize_u64_opt")]
    pub page_size: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: Some(1),
            page_size: Some(20),
        }
    }
}

impl PageRequest {
    pub fn new(page_number: u64, page_size: u64) -> Self {
        Self {
            page_number: Some(page_number),
            page_size: Some(page_size),
        }
    }

    pub fn page_number(&self) -> u64 {
        self.page_number.unwrap_or(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(20)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_number() == 0 {
            return Err(PlatformError::validation("page_number must be >= 1"));
        }
        if self.page_size() == 0 {
            return Err(PlatformError::validation("page_size must be >= 1"));
        }
        Ok(())
    }

    /// Documents to skip for this window. Only meaningful after `validate`.
    pub fn skip(&self) -> u64 {
        self.page_size() * (self.page_number() - 1)
    }

    pub fn limit(&self) -> i64 {
        self.page_size() as i64
    }
}

/// Paginated listing: total match count plus one window of items.
///
/// `total` always reflects the full unpaginated filter; `items` holds at
/// most `page_size` entries for the requested page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSet<T> {
    pub total: i64,
    pub items: Vec<T>,
    pub page: PageRequest,
}

impl<T> ResourceSet<T> {
    pub fn new(page: PageRequest) -> Self {
        Self {
            total: 0,
            items: Vec::new(),
            page,
        }
    }

    pub fn with_total(mut self, total: i64) -> Self {
        self.total = total;
        self
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResourceSet<U> {
        ResourceSet {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
        }
    }
}

/// Whether an update replaces the mutable payload or merges fields into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Full replacement of the mutable payload
    Put,
    /// Field-wise merge; unset fields keep their prior values
    Patch,
}

impl std::str::FromStr for UpdateMode {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "put" => Ok(UpdateMode::Put),
            "patch" => Ok(UpdateMode::Patch),
            other => Err(PlatformError::validation(format!(
                "unknown update mode: {other}"
            ))),
        }
    }
}

/// Compose an optional closed interval into a store predicate for `field`.
///
/// Either bound may be absent; both present means the conjunction of the
/// two comparisons.
pub fn time_range_filter(
    filter: &mut Document,
    field: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) {
    let mut bounds = Document::new();
    if let Some(start) = start {
        bounds.insert("$gte", bson::DateTime::from_chrono(start));
    }
    if let Some(end) = end {
        bounds.insert("$lte", bson::DateTime::from_chrono(end));
    }
    if !bounds.is_empty() {
        filter.insert(field, bounds);
    }
}

/// Success response with optional message
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_page() {
        let page = PageRequest::default();
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.page_size(), 20);
        assert!(page.validate().is_ok());
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_skip_is_size_times_pages_before() {
        let page = PageRequest::new(3, 15);
        assert!(page.validate().is_ok());
        assert_eq!(page.skip(), 30);
        assert_eq!(page.limit(), 15);
    }

    #[test]
    fn test_zero_page_number_rejected() {
        let page = PageRequest::new(0, 20);
        assert!(page.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let page = PageRequest::new(1, 0);
        assert!(page.validate().is_err());
    }

    #[test]
    fn test_window_item_count() {
        // Item count for a window over `total` matches
        // min(p, max(0, total - p*(n-1))).
        let total: u64 = 47;
        let all: Vec<u64> = (0..total).collect();

        for n in 1..=5u64 {
            let page = PageRequest::new(n, 20);
            page.validate().unwrap();
            let skip = page.skip() as usize;
            let limit = page.limit() as usize;
            let window = all.iter().skip(skip).take(limit).count();
            let expected = std::cmp::min(
                20,
                (total as i64 - 20 * (n as i64 - 1)).max(0) as usize as u64,
            ) as usize;
            assert_eq!(window, expected, "page {n}");
        }
    }

    #[test]
    fn test_resource_set_add_and_map() {
        let mut set = ResourceSet::new(PageRequest::default()).with_total(2);
        set.add(1);
        set.add(2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total, 2);

        let mapped = set.map(|v| v * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 2);
    }

    #[test]
    fn test_update_mode_parse() {
        assert_eq!("put".parse::<UpdateMode>().unwrap(), UpdateMode::Put);
        assert_eq!("patch".parse::<UpdateMode>().unwrap(), UpdateMode::Patch);
        assert!("merge".parse::<UpdateMode>().is_err());
        assert!("PUT".parse::<UpdateMode>().is_err());
    }

    #[test]
    fn test_time_range_filter_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut filter = Document::new();
        time_range_filter(&mut filter, "loginAt", Some(start), Some(end));
        let bounds = filter.get_document("loginAt").unwrap();
        assert!(bounds.contains_key("$gte"));
        assert!(bounds.contains_key("$lte"));

        let mut open_ended = Document::new();
        time_range_filter(&mut open_ended, "loginAt", Some(start), None);
        let bounds = open_ended.get_document("loginAt").unwrap();
        assert!(bounds.contains_key("$gte"));
        assert!(!bounds.contains_key("$lte"));

        let mut absent = Document::new();
        time_range_filter(&mut absent, "loginAt", None, None);
        assert!(absent.is_empty());
    }
}
