use serde::Serialize;

/// Page window over a result set of `total` rows. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Pagination {
    /// Clamps the requested page into `1..=total_pages`. A missing or
    /// unparsable page means the first one.
    pub fn new(requested: Option<&str>, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let mut page = Self {
            page: 1,
            per_page,
            total,
        };
        let wanted = requested
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1);
        page.page = wanted.clamp(1, page.total_pages());
        page
    }

    /// At least one page, even for an empty result.
    pub fn total_pages(&self) -> u32 {
        let pages = (self.total + u64::from(self.per_page) - 1) / u64::from(self.per_page);
        pages.clamp(1, u64::from(u32::MAX)) as u32
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}
