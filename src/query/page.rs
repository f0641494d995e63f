//! Paginated result shape shared by every list endpoint.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    /// `ceil(total / limit)`, 0 when there are no rows.
    pub last_page: u64,
    pub limit: u32,
}

impl PageMeta {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        PageMeta {
            total,
            page: page.max(1),
            last_page: total.div_ceil(u64::from(limit)),
            limit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PaginatedResult<T> {
    /// Items beyond `limit` are dropped so a page never exceeds its size.
    pub fn new(mut items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let meta = PageMeta::new(total, page, limit);
        items.truncate(meta.limit as usize);
        PaginatedResult { items, meta }
    }

    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
