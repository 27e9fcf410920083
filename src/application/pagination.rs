//! Shared page-number pagination helpers.

use serde::Serialize;

/// Posts per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A 1-based page request. Construction clamps both fields to at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Interpret a raw `?page=` value. Missing, non-numeric or zero values mean page 1.
    pub fn from_query(raw: Option<&str>, size: u32) -> Self {
        let number = raw
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(1);
        Self::new(number, size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// One page of an ordered sequence plus the totals needed to render navigation.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Wrap items already sliced by the store.
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            number: request.number,
            size: request.size,
            total,
        }
    }

    /// Slice an in-memory sequence, keeping its order.
    pub fn from_vec(sequence: Vec<T>, request: PageRequest) -> Self {
        let total = sequence.len() as u64;
        let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = sequence
            .into_iter()
            .skip(start)
            .take(request.size as usize)
            .collect();
        Self::new(items, total, request)
    }

    /// Number of pages; an empty sequence still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        let size = u64::from(self.size.max(1));
        let pages = self.total.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total: self.total,
        }
    }
}

/// Return the `page_number`-th slice of `sequence` (1-based).
///
/// The last page may be short; pages past the end are empty.
pub fn paginate<T: Clone>(sequence: &[T], page_number: u32, page_size: u32) -> Vec<T> {
    let request = PageRequest::new(page_number, page_size);
    let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    sequence
        .iter()
        .skip(start)
        .take(request.size as usize)
        .cloned()
        .collect()
}
