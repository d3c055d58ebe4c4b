use std::fmt;

use url::Url;

use crate::SiteConfig;

/// An absolute URL to a page on the site.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Permalink(Url);

impl Permalink {
    /// Returns the permalink for a site-relative path, resolved against the
    /// site's base URL (including any path the base URL has).
    pub fn from_path(config: &SiteConfig, path: &str) -> Self {
        let base_path = config.base_url.path().trim_end_matches('/');
        let path = path.trim_start_matches('/');

        let mut url = config.base_url.clone();
        url.set_path(&format!("{base_path}/{path}"));

        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for Permalink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_config(base_url: &str) -> SiteConfig {
        toml::from_str(&format!(r#"base_url = "{base_url}""#)).unwrap()
    }

    #[test]
    fn test_permalink() {
        assert_eq!(
            Permalink::from_path(&make_config("https://example.com/"), "/").as_str(),
            "https://example.com/"
        );
        assert_eq!(
            Permalink::from_path(&make_config("https://example.com"), "").as_str(),
            "https://example.com/"
        );
        assert_eq!(
            Permalink::from_path(&make_config("https://example.com"), "/tag/rust").as_str(),
            "https://example.com/tag/rust"
        );
    }

    #[test]
    fn test_permalink_under_base_path() {
        let permalink =
            Permalink::from_path(&make_config("https://example.com/blog"), "/category/rust");

        assert_eq!(permalink.as_str(), "https://example.com/blog/category/rust");
        assert_eq!(permalink.path(), "/blog/category/rust");
    }
}
