//! Search filters and pagination for event queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::event::EventState;
use crate::utils::errors::{AfishaError, Result};

/// Requested ordering of a public event search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSort {
    EventDate,
    Views,
}

/// `from`/`size` pagination pair translated to page-based offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    from: i32,
    size: i32,
}

impl Page {
    pub fn new(from: i32, size: i32) -> Result<Self> {
        if size <= 0 {
            return Err(AfishaError::Validation(format!(
                "Page size must be positive, got {size}"
            )));
        }
        if from < 0 {
            return Err(AfishaError::Validation(format!(
                "Page offset cannot be negative, got {from}"
            )));
        }
        Ok(Self { from, size })
    }

    /// Offset of the page containing element `from`.
    pub fn offset(&self) -> i64 {
        i64::from(self.from / self.size) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// Parameters of the public event search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSearch {
    pub text: Option<String>,
    pub categories: Option<Vec<i32>>,
    pub paid: Option<bool>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub only_available: bool,
    pub sort: Option<EventSort>,
    #[serde(default)]
    pub from: i32,
    #[serde(default = "default_page_size")]
    pub size: i32,
}

/// Parameters of the administrative event search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSearch {
    pub users: Option<Vec<i32>>,
    pub states: Option<Vec<EventState>>,
    pub categories: Option<Vec<i32>>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub from: i32,
    #[serde(default = "default_page_size")]
    pub size: i32,
}

fn default_page_size() -> i32 {
    10
}

impl Default for PublicSearch {
    fn default() -> Self {
        Self {
            text: None,
            categories: None,
            paid: None,
            range_start: None,
            range_end: None,
            only_available: false,
            sort: None,
            from: 0,
            size: default_page_size(),
        }
    }
}

impl Default for AdminSearch {
    fn default() -> Self {
        Self {
            users: None,
            states: None,
            categories: None,
            range_start: None,
            range_end: None,
            from: 0,
            size: default_page_size(),
        }
    }
}

/// Combined predicate set handed to the event repository. Every `None`
/// leaves the corresponding dimension unconstrained.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub text: Option<String>,
    pub categories: Option<Vec<i32>>,
    pub paid: Option<bool>,
    pub users: Option<Vec<i32>>,
    pub states: Option<Vec<EventState>>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
}

/// SQL-side ordering of a search page. Sorting by views happens in
/// memory after stats enrichment, so it maps to the stable id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    ById,
    ByEventDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn page_translates_from_to_page_offset() {
        let page = Page::new(0, 10).unwrap();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 10);

        // from=25, size=10 lands on the third page
        let page = Page::new(25, 10).unwrap();
        assert_eq!(page.offset(), 20);

        let page = Page::new(30, 10).unwrap();
        assert_eq!(page.offset(), 30);
    }

    #[test]
    fn page_rejects_non_positive_size() {
        assert_matches!(Page::new(0, 0), Err(AfishaError::Validation(_)));
        assert_matches!(Page::new(0, -5), Err(AfishaError::Validation(_)));
    }

    #[test]
    fn page_rejects_negative_from() {
        assert_matches!(Page::new(-1, 10), Err(AfishaError::Validation(_)));
    }
}
