//! Paged listings of posts, with the breadcrumbs, page links, and page meta
//! that go with them.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{Routes, SiteConfig};
use crate::paginate::{PageLinks, Paginator, PaginatorState};
use crate::taxonomy::{
    resolve_path, resolve_subtree, Crumb, Crumbs, DescendantIds, NotFoundError, ResolvePathError,
    StructuralError, TaxonomyTree, TaxonomyType, TaxonomyUrls, Visibility,
};
use crate::text::{page_title, strip_html_tags, truncate, unique_keywords};

/// A countable, sliceable collection behind a listing.
pub trait PagedQuery {
    type Item;
    type Filter;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns how many items match the filter.
    fn count(&self, filter: &Self::Filter) -> Result<usize, Self::Error>;

    /// Returns at most `limit` matching items, skipping the first `offset`.
    fn fetch(
        &self,
        filter: &Self::Filter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Self::Item>, Self::Error>;
}

/// Which posts a listing shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub keyword: Option<String>,

    /// Posts must belong to at least one of these taxonomies.
    pub taxonomy_ids: Option<DescendantIds>,
    pub archive: Option<ArchivePeriod>,
    pub visibility: Visibility,
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("{year}/{month:?} is not a valid archive period")]
pub struct InvalidArchiveError {
    pub year: i32,
    pub month: Option<u32>,
}

/// A year, or a month within a year, of published posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePeriod {
    year: i32,
    month: Option<u32>,
    start: NaiveDate,
    end: NaiveDate,
}

impl ArchivePeriod {
    pub fn new(year: i32, month: Option<u32>) -> Result<Self, InvalidArchiveError> {
        let invalid = || InvalidArchiveError { year, month };

        let start = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1).ok_or_else(invalid)?;
        let end = match month {
            Some(12) | None => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            Some(month) => NaiveDate::from_ymd_opt(year, month + 1, 1),
        }
        .ok_or_else(invalid)?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// The first day of the period.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// The first day after the period.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Returns a label such as `2024` or `July 2024`.
    pub fn label(&self) -> String {
        match self.month {
            Some(_) => self.start.format("%B %Y").to_string(),
            None => self.year.to_string(),
        }
    }
}

/// The `<head>` meta of a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingMeta {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// How many wide characters of a post's content make up its description.
pub const POST_DESCRIPTION_LENGTH: usize = 140;

/// Returns the meta description of a post: its excerpt when it has one,
/// otherwise the start of its content with the markup removed.
pub fn post_description(excerpt: Option<&str>, content: &str) -> String {
    match excerpt.map(str::trim).filter(|excerpt| !excerpt.is_empty()) {
        Some(excerpt) => excerpt.to_string(),
        None => truncate(strip_html_tags(content).trim(), POST_DESCRIPTION_LENGTH),
    }
}

/// One page of items, with its pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub paginator: PaginatorState,
}

/// Everything a listing page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub paginator: PaginatorState,
    pub crumbs: Crumbs,
    pub page_links: PageLinks,
    pub meta: ListingMeta,
}

#[derive(Error, Debug)]
pub enum ListingError<E: std::error::Error + 'static> {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    InvalidArchive(#[from] InvalidArchiveError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("listing query failed: {0}")]
    Query(#[source] E),
}

impl<E: std::error::Error + 'static> From<ResolvePathError> for ListingError<E> {
    fn from(err: ResolvePathError) -> Self {
        match err {
            ResolvePathError::NotFound(err) => Self::NotFound(err),
            ResolvePathError::Structural(err) => Self::Structural(err),
        }
    }
}

/// Counts the items matching `filter`, clamps `requested_page` to the pages
/// that exist, and fetches that page.
pub fn page<Q: PagedQuery>(
    paginator: &Paginator,
    query: &Q,
    filter: &Q::Filter,
    requested_page: usize,
) -> Result<Page<Q::Item>, Q::Error> {
    let total_items = query.count(filter)?;
    let state = paginator.paginate(requested_page, total_items);
    let items = query.fetch(filter, state.offset, state.page_size)?;

    debug!(
        requested_page,
        page = state.current_page,
        total_pages = state.total_pages,
        items = items.len(),
        "fetched listing page"
    );

    Ok(Page {
        items,
        paginator: state,
    })
}

/// Builds the post listings of a site from one taxonomy snapshot.
pub struct ListingOrchestrator<'a, Q> {
    config: &'a SiteConfig,
    tree: &'a TaxonomyTree,
    paginator: Paginator,
    query: Q,
}

impl<'a, Q> ListingOrchestrator<'a, Q>
where
    Q: PagedQuery<Filter = PostFilter>,
{
    pub fn new(config: &'a SiteConfig, tree: &'a TaxonomyTree, query: Q) -> Self {
        Self {
            config,
            tree,
            paginator: config.paginator(),
            query,
        }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    /// The home listing, or search results when `keyword` is given.
    pub fn posts(
        &self,
        page: usize,
        keyword: Option<&str>,
        visibility: Visibility,
    ) -> Result<Listing<Q::Item>, ListingError<Q::Error>> {
        let keyword = keyword.map(str::trim).filter(|keyword| !keyword.is_empty());
        let filter = PostFilter {
            keyword: keyword.map(str::to_string),
            visibility,
            ..Default::default()
        };

        let mut page_links = PageLinks::new(Routes::page_prefix(&self.routes().posts));
        if let Some(keyword) = keyword {
            let encoded =
                url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect::<String>();
            page_links = page_links.with_param(format!("?keyword={encoded}"));
        }

        let listing = self.fetch(&filter, page)?;
        let current_page = listing.paginator.current_page;
        let meta = match keyword {
            Some(keyword) => ListingMeta {
                title: page_title([keyword, "Search results", self.site_title()], current_page),
                description: self
                    .description(&format!("Posts matching \"{keyword}\""), current_page),
                keywords: self.keywords(&[keyword]),
            },
            None => ListingMeta {
                title: page_title([self.site_title()], current_page),
                description: self.description("", current_page),
                keywords: self.keywords(&[]),
            },
        };

        Ok(Listing {
            items: listing.items,
            paginator: listing.paginator,
            crumbs: Crumbs::default(),
            page_links,
            meta,
        })
    }

    /// Posts in a category or any of its visible descendants.
    pub fn posts_by_category(
        &self,
        slug: &str,
        page: usize,
        visibility: Visibility,
    ) -> Result<Listing<Q::Item>, ListingError<Q::Error>> {
        let subtree = resolve_subtree(self.tree, slug, TaxonomyType::Post, visibility)?;
        let crumbs = resolve_path(self.tree, &subtree.root.id, self.routes())?;
        let name = subtree.root.name.as_str();

        let filter = PostFilter {
            taxonomy_ids: Some(subtree.descendant_ids.clone()),
            visibility,
            ..Default::default()
        };
        let listing = self.fetch(&filter, page)?;
        let current_page = listing.paginator.current_page;

        Ok(Listing {
            items: listing.items,
            page_links: PageLinks::new(Routes::page_prefix(
                &self.routes().taxonomy_url(subtree.root),
            )),
            meta: ListingMeta {
                title: page_title([name, "Categories", self.site_title()], current_page),
                description: self.description(&format!("Posts filed under {name}"), current_page),
                keywords: self.keywords(&[name]),
            },
            paginator: listing.paginator,
            crumbs,
        })
    }

    /// Posts with a tag.
    pub fn posts_by_tag(
        &self,
        slug: &str,
        page: usize,
        visibility: Visibility,
    ) -> Result<Listing<Q::Item>, ListingError<Q::Error>> {
        let tag = self
            .tree
            .get_by_slug(TaxonomyType::Tag, slug)
            .filter(|tag| tag.is_visible_to(visibility))
            .ok_or_else(|| NotFoundError(slug.to_string()))?;
        let tag_url = self.routes().taxonomy_url(tag);

        let filter = PostFilter {
            taxonomy_ids: Some([tag.id.clone()].into_iter().collect()),
            visibility,
            ..Default::default()
        };
        let listing = self.fetch(&filter, page)?;
        let current_page = listing.paginator.current_page;
        let name = tag.name.as_str();

        Ok(Listing {
            items: listing.items,
            paginator: listing.paginator,
            crumbs: Crumbs::new([
                Crumb::section("Tags", &self.routes().tag),
                Crumb::for_node(tag, tag_url.clone()),
            ]),
            page_links: PageLinks::new(Routes::page_prefix(&tag_url)),
            meta: ListingMeta {
                title: page_title([name, "Tags", self.site_title()], current_page),
                description: self.description(&format!("Posts tagged {name}"), current_page),
                keywords: self.keywords(&[name]),
            },
        })
    }

    /// Posts published in a year, or in a month of that year.
    pub fn posts_by_archive(
        &self,
        year: i32,
        month: Option<u32>,
        page: usize,
        visibility: Visibility,
    ) -> Result<Listing<Q::Item>, ListingError<Q::Error>> {
        let period = ArchivePeriod::new(year, month)?;
        let archive = &self.routes().archive;
        let year_segment = period.year().to_string();
        let year_url = Routes::join(archive, [year_segment.as_str()]);

        let mut crumbs = vec![
            Crumb::section("Archive", archive),
            Crumb::section(year_segment.clone(), year_url.clone()),
        ];
        let mut period_url = year_url;
        if let Some(month) = period.month() {
            let month_segment = format!("{month:02}");
            period_url = Routes::join(archive, [year_segment.as_str(), month_segment.as_str()]);
            crumbs.push(Crumb::section(
                period.start().format("%B").to_string(),
                period_url.clone(),
            ));
        }

        let filter = PostFilter {
            archive: Some(period),
            visibility,
            ..Default::default()
        };
        let listing = self.fetch(&filter, page)?;
        let current_page = listing.paginator.current_page;
        let label = period.label();

        Ok(Listing {
            items: listing.items,
            paginator: listing.paginator,
            crumbs: Crumbs::new(crumbs),
            page_links: PageLinks::new(Routes::page_prefix(&period_url)),
            meta: ListingMeta {
                title: page_title([label.as_str(), "Archive", self.site_title()], current_page),
                description: self.description(&format!("Posts from {label}"), current_page),
                keywords: self.keywords(&[]),
            },
        })
    }

    fn fetch(
        &self,
        filter: &PostFilter,
        requested_page: usize,
    ) -> Result<Page<Q::Item>, ListingError<Q::Error>> {
        page(&self.paginator, &self.query, filter, requested_page).map_err(ListingError::Query)
    }

    fn routes(&self) -> &Routes {
        &self.config.routes
    }

    fn site_title(&self) -> &str {
        self.config.title.as_deref().unwrap_or_default()
    }

    fn description(&self, lead: &str, page: usize) -> String {
        let mut parts = Vec::new();
        if !lead.is_empty() {
            parts.push(match page {
                1 => format!("{lead}."),
                page => format!("{lead} (page {page})."),
            });
        }
        if let Some(description) = self.config.description.as_deref() {
            parts.push(description.to_string());
        }
        parts.join(" ")
    }

    fn keywords(&self, leading: &[&str]) -> Vec<String> {
        unique_keywords(
            leading
                .iter()
                .copied()
                .chain(self.config.keywords.iter().map(String::as_str)),
        )
    }
}
