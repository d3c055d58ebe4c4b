use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(page_size) => page_size,
    None => panic!("must be non-zero"),
};

pub const DEFAULT_WINDOW: NonZeroUsize = match NonZeroUsize::new(9) {
    Some(window) => window,
    None => panic!("must be non-zero"),
};

/// Splits a listing of known size into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
    window: NonZeroUsize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            window: DEFAULT_WINDOW,
        }
    }

    /// Sets how many page numbers the page bar shows around the current page.
    pub fn with_window(mut self, window: NonZeroUsize) -> Self {
        self.window = window;
        self
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Returns the state for `requested_page` of a listing with `total_items`.
    ///
    /// Out-of-range requests are clamped: page `0` becomes the first page and
    /// anything past the end becomes the last. An empty listing has one
    /// (empty) page.
    pub fn paginate(&self, requested_page: usize, total_items: usize) -> PaginatorState {
        let page_size = self.page_size.get();
        let total_pages = total_items.div_ceil(page_size).max(1);
        let current_page = requested_page.clamp(1, total_pages);

        let window = self.window.get().min(total_pages);
        let lead = (window - 1) / 2;
        let start = current_page
            .saturating_sub(lead)
            .max(1)
            .min(total_pages - window + 1);

        PaginatorState {
            current_page,
            total_pages,
            page_size,
            total_items,
            offset: page_size * (current_page - 1),
            display_range: start..=start + window - 1,
        }
    }
}

/// Paginates with the default page bar window.
pub fn paginate(requested_page: usize, total_items: usize, page_size: NonZeroUsize) -> PaginatorState {
    Paginator::new(page_size).paginate(requested_page, total_items)
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatorState {
    /// The 1-based page being shown, after clamping.
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,

    /// How many items precede this page.
    pub offset: usize,

    /// The page numbers to show in the page bar.
    pub display_range: RangeInclusive<usize>,
}

impl PaginatorState {
    pub fn is_first(&self) -> bool {
        self.current_page == 1
    }

    pub fn is_last(&self) -> bool {
        self.current_page == self.total_pages
    }

    pub fn prev_page(&self) -> Option<usize> {
        (!self.is_first()).then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        (!self.is_last()).then(|| self.current_page + 1)
    }

    /// Whether the page bar needs a separate link to page 1.
    pub fn shows_first(&self) -> bool {
        *self.display_range.start() > 1
    }

    /// Whether the page bar needs a separate link to the last page.
    pub fn shows_last(&self) -> bool {
        *self.display_range.end() < self.total_pages
    }

    pub fn pages(&self) -> RangeInclusive<usize> {
        self.display_range.clone()
    }
}

/// How page numbers are turned into URLs.
///
/// A page URL is `link_url` followed by the page number and `link_param`,
/// e.g. `/category/rust/page-` + `2` + `?keyword=async`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub link_url: String,
    pub link_param: String,
}

impl PageLinks {
    pub fn new(link_url: impl Into<String>) -> Self {
        Self {
            link_url: link_url.into(),
            link_param: String::new(),
        }
    }

    pub fn with_param(mut self, link_param: impl Into<String>) -> Self {
        self.link_param = link_param.into();
        self
    }

    pub fn url(&self, page: usize) -> String {
        format!("{}{}{}", self.link_url, page, self.link_param)
    }
}
