use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::config::PagingConfig;

/// A normalized page request: both numbers are always at least 1 and the
/// size never exceeds the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Absent or non-positive values fall back to the defaults; oversized
    /// pages are clamped.
    pub fn normalize(page: Option<i64>, page_size: Option<i64>, config: &PagingConfig) -> Self {
        let max = config.max_page_size.max(1);

        let page = match page {
            Some(p) if p > 0 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => config.default_page.max(1),
        };
        let page_size = match page_size {
            Some(s) if s > 0 => u32::try_from(s).unwrap_or(u32::MAX),
            _ => config.default_page_size.max(1),
        };

        Self {
            page,
            page_size: page_size.min(max),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::normalize(None, None, &PagingConfig::default())
    }
}

/// One page of results. The derived counters are computed on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Reshape the items, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

impl<T: Serialize> Serialize for PageResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PageResult", 7)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("pageSize", &self.page_size)?;
        state.serialize_field("totalCount", &self.total_count)?;
        state.serialize_field("totalPages", &self.total_pages())?;
        state.serialize_field("hasNext", &self.has_next())?;
        state.serialize_field("hasPrevious", &self.has_previous())?;
        state.end()
    }
}
