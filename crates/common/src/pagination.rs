use serde::Deserialize;

/// Page/limit pair as accepted by the list endpoints. Pages are 1-based on
/// the wire; `normalize` converts to the 0-based page index the paginator
/// expects and clamps the page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page", alias = "limit")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page() }
    }
}

impl Pagination {
    pub const MAX_PER_PAGE: u64 = 500;

    /// Returns (zero-based page index, clamped page size).
    pub fn normalize(&self) -> (u64, u64) {
        let page_idx = self.page.saturating_sub(1);
        let per_page = self.per_page.clamp(1, Self::MAX_PER_PAGE);
        (page_idx, per_page)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        let (_, per_page) = self.normalize();
        total.div_ceil(per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_and_shifts() {
        let p = Pagination { page: 1, per_page: 50 };
        assert_eq!(p.normalize(), (0, 50));

        let p = Pagination { page: 0, per_page: 0 };
        assert_eq!(p.normalize(), (0, 1));

        let p = Pagination { page: 3, per_page: 10_000 };
        assert_eq!(p.normalize(), (2, Pagination::MAX_PER_PAGE));
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination { page: 1, per_page: 50 };
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(50), 1);
        assert_eq!(p.total_pages(51), 2);
    }
}
