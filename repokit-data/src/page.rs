use serde::{Deserialize, Serialize};

/// Page size substituted when neither a size nor a page number is given.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest limit or offset a database accepts (signed 64-bit).
pub const MAX_WINDOW: u64 = i64::MAX as u64;

/// Paging and count directive for a list query.
///
/// `page_num` is 1-based. See [`Limit::window`] for how the fields combine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limit {
    pub all: bool,
    pub page_size: u64,
    pub page_num: u64,
    pub want_count: bool,
}

/// The effective `LIMIT` / `OFFSET` pair for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Limit {
    /// Every matching row, no paging.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn page(page_num: u64, page_size: u64) -> Self {
        Self {
            page_num,
            page_size,
            ..Self::default()
        }
    }

    /// Also compute the total number of matching rows.
    pub fn with_count(mut self) -> Self {
        self.want_count = true;
        self
    }

    /// Resolve the paging fields, in order:
    ///
    /// 1. `all` disables limit and offset.
    /// 2. size and page set: offset `(page - 1) * size`, limit `size`.
    /// 3. size set, page zero: limit only.
    /// 4. otherwise page 1 of [`DEFAULT_PAGE_SIZE`].
    ///
    /// Limit and offset saturate at [`MAX_WINDOW`].
    pub fn window(&self) -> Window {
        if self.all {
            return Window::default();
        }
        match (self.page_size, self.page_num) {
            (size, 0) if size > 0 => Window {
                limit: Some(size.min(MAX_WINDOW)),
                offset: None,
            },
            (size, page) if size > 0 => Window {
                limit: Some(size.min(MAX_WINDOW)),
                offset: Some((page - 1).saturating_mul(size).min(MAX_WINDOW)),
            },
            _ => Window {
                limit: Some(DEFAULT_PAGE_SIZE),
                offset: Some(0),
            },
        }
    }

    /// The `(page_num, page_size)` actually applied; `(0, 0)` when `all`.
    pub fn effective(&self) -> (u64, u64) {
        if self.all {
            return (0, 0);
        }
        match (self.page_size, self.page_num) {
            (0, _) => (1, DEFAULT_PAGE_SIZE),
            (size, page) => (page, size),
        }
    }
}

/// A page of results with paging metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_num: u64,
    pub page_size: u64,
    /// Present only when the count was requested.
    pub total_elements: Option<u64>,
    pub total_pages: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, limit: &Limit, total_elements: Option<u64>) -> Self {
        let (page_num, page_size) = limit.effective();
        let total_pages = total_elements.map(|total| {
            if page_size == 0 {
                u64::from(total > 0)
            } else {
                total.div_ceil(page_size)
            }
        });
        Self {
            content,
            page_num,
            page_size,
            total_elements,
            total_pages,
        }
    }

    pub fn total(&self) -> u64 {
        self.total_elements.unwrap_or(0)
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }
}
