use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

use crate::paginate::{Paginator, DEFAULT_PAGE_SIZE, DEFAULT_WINDOW};
use crate::permalink::Permalink;
use crate::taxonomy::{TaxonomyNode, TaxonomyType, TaxonomyUrls};

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(deserialize_with = "base_url")]
    pub base_url: Url,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub routes: Routes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// The number of items on a listing page.
    pub page_size: NonZeroUsize,

    /// The number of page links shown in a page bar.
    pub window: NonZeroUsize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            window: DEFAULT_WINDOW,
        }
    }
}

/// The base paths listings are served under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub category: String,
    pub tag: String,
    pub link: String,
    pub archive: String,
    pub posts: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            category: "/category".to_string(),
            tag: "/tag".to_string(),
            link: "/link".to_string(),
            archive: "/archive".to_string(),
            posts: "/post".to_string(),
        }
    }
}

impl Routes {
    pub fn taxonomy_base(&self, taxonomy_type: TaxonomyType) -> &str {
        match taxonomy_type {
            TaxonomyType::Post => &self.category,
            TaxonomyType::Tag => &self.tag,
            TaxonomyType::Link => &self.link,
        }
    }

    /// Joins path segments onto a base path.
    pub fn join<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> String {
        let mut path = base.trim_end_matches('/').to_string();
        for segment in segments {
            path.push('/');
            path.push_str(segment.trim_matches('/'));
        }
        path
    }

    /// Returns the prefix page numbers are appended to, e.g. `/tag/rust/page-`.
    pub fn page_prefix(path: &str) -> String {
        format!("{}/page-", path.trim_end_matches('/'))
    }
}

impl TaxonomyUrls for Routes {
    fn taxonomy_url(&self, node: &TaxonomyNode) -> String {
        Self::join(self.taxonomy_base(node.taxonomy_type), [node.slug.as_str()])
    }
}

/// Taxonomy URLs made absolute against the site's base URL.
pub struct AbsoluteUrls<'a>(pub &'a SiteConfig);

impl TaxonomyUrls for AbsoluteUrls<'_> {
    fn taxonomy_url(&self, node: &TaxonomyNode) -> String {
        let path = self.0.routes.taxonomy_url(node);
        Permalink::from_path(self.0, &path).as_str().to_string()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config in '{filepath}': {source}")]
    Invalid {
        filepath: PathBuf,
        source: toml::de::Error,
    },
}

impl SiteConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        toml::from_str(&contents).map_err(|source| ConfigError::Invalid {
            filepath: path.to_owned(),
            source,
        })
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.pagination.page_size).with_window(self.pagination.window)
    }

    pub fn permalink(&self, path: &str) -> Permalink {
        Permalink::from_path(self, path)
    }
}

fn base_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let base_url = String::deserialize(deserializer)?;
    let url = Url::parse(&base_url).map_err(D::Error::custom)?;

    if url.cannot_be_a_base() {
        return Err(D::Error::custom(format!(
            "'{base_url}' cannot be used as a base URL"
        )));
    }

    Ok(url)
}
