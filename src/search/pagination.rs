//! 1-based page windows over a ranked list

/// One page of a ranked list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole list before windowing
    pub total: usize,
    /// `page × page_size < total`
    pub has_next: bool,
}

/// Slice `[(page - 1) × page_size, page × page_size)` out of `items`
///
/// Page 0, page size 0, or a page past the end yield an empty slice with the
/// correct `total`, never a panic.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let total = items.len();

    if page == 0 || page_size == 0 {
        return Page {
            items: Vec::new(),
            total,
            has_next: false,
        };
    }

    let start = (page - 1).saturating_mul(page_size);
    let end = page.saturating_mul(page_size);

    Page {
        items: items.into_iter().skip(start).take(page_size).collect(),
        total,
        has_next: end < total,
    }
}
