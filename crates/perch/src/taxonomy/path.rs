use derive_more::{Deref, DerefMut, IntoIterator};
use serde::Serialize;
use thiserror::Error;

use crate::taxonomy::{
    StructuralError, TaxonomyId, TaxonomyNode, TaxonomyTree, TaxonomyType, Visibility,
};

/// A single entry in a breadcrumb trail.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Crumb {
    pub label: String,
    pub tooltip: String,
    pub url: String,
    /// The slug of the taxonomy behind this crumb, if there is one.
    pub slug: Option<String>,
    pub is_current: bool,
}

impl Crumb {
    /// Returns a crumb that does not correspond to a taxonomy node.
    pub fn section(label: impl Into<String>, url: impl Into<String>) -> Self {
        let label = label.into();

        Self {
            tooltip: label.clone(),
            label,
            url: url.into(),
            slug: None,
            is_current: false,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    /// Returns a crumb for a taxonomy node. The tooltip is the node's
    /// description, falling back to its name.
    pub fn for_node(node: &TaxonomyNode, url: String) -> Self {
        let tooltip = if node.description.trim().is_empty() {
            node.name.clone()
        } else {
            node.description.clone()
        };

        Self {
            label: node.name.clone(),
            tooltip,
            url,
            slug: Some(node.slug.clone()),
            is_current: false,
        }
    }
}

/// A breadcrumb trail, ordered from the outermost entry to the current one.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deref, DerefMut, IntoIterator)]
#[serde(transparent)]
pub struct Crumbs(Vec<Crumb>);

impl Crumbs {
    /// Returns a trail made of the given crumbs, with only the last one
    /// marked as current.
    pub fn new(crumbs: impl IntoIterator<Item = Crumb>) -> Self {
        let mut crumbs = Self(crumbs.into_iter().collect());
        crumbs.mark_current();
        crumbs
    }

    /// Appends the given crumbs after the existing ones.
    pub fn join(mut self, crumbs: impl IntoIterator<Item = Crumb>) -> Self {
        self.0.extend(crumbs);
        self.mark_current();
        self
    }

    pub fn current(&self) -> Option<&Crumb> {
        self.0.last()
    }

    fn mark_current(&mut self) {
        let last = self.0.len().saturating_sub(1);
        for (index, crumb) in self.0.iter_mut().enumerate() {
            crumb.is_current = index == last;
        }
    }
}

/// Formats the URL a taxonomy crumb links to.
pub trait TaxonomyUrls {
    fn taxonomy_url(&self, node: &TaxonomyNode) -> String;
}

impl<F> TaxonomyUrls for F
where
    F: Fn(&TaxonomyNode) -> String,
{
    fn taxonomy_url(&self, node: &TaxonomyNode) -> String {
        self(node)
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("taxonomy '{0}' not found")]
pub struct NotFoundError(pub String);

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ResolvePathError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// Returns the breadcrumbs leading from the root of the node's tree down to
/// the node itself.
pub fn resolve_path(
    tree: &TaxonomyTree,
    id: &TaxonomyId,
    urls: &impl TaxonomyUrls,
) -> Result<Crumbs, ResolvePathError> {
    let node = tree
        .get(id)
        .ok_or_else(|| NotFoundError(id.to_string()))?;

    let mut ancestors = vec![node];
    while let Some(parent) = ancestors.last().and_then(|node| tree.parent(&node.id)) {
        // The tree is validated on build, so this only trips on a bug.
        if ancestors.len() >= tree.len() {
            return Err(StructuralError::Cycle {
                id: parent.id.clone(),
            }
            .into());
        }

        ancestors.push(parent);
    }

    Ok(Crumbs::new(
        ancestors
            .into_iter()
            .rev()
            .map(|node| Crumb::for_node(node, urls.taxonomy_url(node))),
    ))
}

/// Picks which of a post's categories drives its breadcrumbs, and resolves
/// them.
///
/// `taxonomies` may hold all of the post's taxonomies; only categories are
/// considered. When the visitor arrived from one of the categories' listings
/// (the referer ends with its slug), that category wins; otherwise the first
/// visible category does. Returns `None` when none of the categories are
/// visible.
pub fn post_crumbs(
    tree: &TaxonomyTree,
    taxonomies: &[TaxonomyId],
    referer: Option<&str>,
    visibility: Visibility,
    urls: &impl TaxonomyUrls,
) -> Option<Result<Crumbs, ResolvePathError>> {
    let visible = taxonomies
        .iter()
        .filter_map(|id| tree.get(id))
        .filter(|node| node.taxonomy_type == TaxonomyType::Post)
        .filter(|node| is_visible_with_ancestors(tree, node, visibility))
        .collect::<Vec<_>>();

    let from_referer = referer.and_then(|referer| {
        let referer = referer.trim_end_matches('/');
        visible
            .iter()
            .find(|node| referer.ends_with(&format!("/{}", node.slug)))
    });

    let node = from_referer.or_else(|| visible.first())?;

    Some(resolve_path(tree, &node.id, urls))
}

/// Returns whether the node and every one of its ancestors is visible.
pub(crate) fn is_visible_with_ancestors(
    tree: &TaxonomyTree,
    node: &TaxonomyNode,
    visibility: Visibility,
) -> bool {
    if visibility.is_admin() {
        return true;
    }

    let mut current = Some(node);
    let mut steps = 0;
    while let Some(node) = current {
        if !node.is_visible_to(visibility) || steps > tree.len() {
            return false;
        }

        steps += 1;
        current = tree.parent(&node.id);
    }

    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::taxonomy::TaxonomyStatus;

    use super::*;

    fn tree() -> TaxonomyTree {
        TaxonomyTree::build(vec![
            TaxonomyNode::new("1", TaxonomyType::Post, "tech", "Tech")
                .with_description("Technology"),
            TaxonomyNode::new("2", TaxonomyType::Post, "programming", "Programming")
                .with_parent("1"),
            TaxonomyNode::new("3", TaxonomyType::Post, "rust", "Rust").with_parent("2"),
            TaxonomyNode::new("4", TaxonomyType::Post, "life", "Life")
                .with_status(TaxonomyStatus::Hidden),
            TaxonomyNode::new("5", TaxonomyType::Post, "travel", "Travel").with_parent("4"),
            TaxonomyNode::new("6", TaxonomyType::Tag, "rust-tag", "RustTag"),
        ])
        .unwrap()
    }

    fn category_url(node: &TaxonomyNode) -> String {
        format!("/category/{}", node.slug)
    }

    #[test]
    fn test_resolve_three_level_path() {
        let crumbs = resolve_path(&tree(), &"3".into(), &category_url).unwrap();

        assert_eq!(
            crumbs,
            Crumbs(vec![
                Crumb {
                    label: "Tech".into(),
                    tooltip: "Technology".into(),
                    url: "/category/tech".into(),
                    slug: Some("tech".into()),
                    is_current: false,
                },
                Crumb {
                    label: "Programming".into(),
                    tooltip: "Programming".into(),
                    url: "/category/programming".into(),
                    slug: Some("programming".into()),
                    is_current: false,
                },
                Crumb {
                    label: "Rust".into(),
                    tooltip: "Rust".into(),
                    url: "/category/rust".into(),
                    slug: Some("rust".into()),
                    is_current: true,
                },
            ])
        );
    }

    #[test]
    fn test_resolve_root_path() {
        let crumbs = resolve_path(&tree(), &"1".into(), &category_url).unwrap();

        assert_eq!(crumbs.len(), 1);
        assert!(crumbs[0].is_current);
    }

    #[test]
    fn test_resolve_missing_node() {
        assert_eq!(
            resolve_path(&tree(), &"404".into(), &category_url).unwrap_err(),
            ResolvePathError::NotFound(NotFoundError("404".into()))
        );
    }

    #[test]
    fn test_crumbs_join_moves_current_marker() {
        let crumbs = Crumbs::new([Crumb::section("Archive", "/archive")])
            .join([Crumb::section("2024", "/archive/2024")]);

        assert_eq!(
            crumbs
                .iter()
                .map(|crumb| (crumb.label.as_str(), crumb.is_current))
                .collect::<Vec<_>>(),
            vec![("Archive", false), ("2024", true)]
        );
    }

    #[test]
    fn test_post_crumbs_prefers_referer() {
        let tree = tree();
        let categories: Vec<TaxonomyId> = vec!["2".into(), "3".into()];

        let crumbs = post_crumbs(
            &tree,
            &categories,
            Some("https://example.com/category/rust/"),
            Visibility::Public,
            &category_url,
        )
        .unwrap()
        .unwrap();
        assert_eq!(crumbs.current().map(|crumb| crumb.label.as_str()), Some("Rust"));

        let crumbs = post_crumbs(&tree, &categories, None, Visibility::Public, &category_url)
            .unwrap()
            .unwrap();
        assert_eq!(
            crumbs.current().map(|crumb| crumb.label.as_str()),
            Some("Programming")
        );
    }

    #[test]
    fn test_post_crumbs_skips_hidden_categories() {
        let tree = tree();
        let categories: Vec<TaxonomyId> = vec!["5".into()];

        assert_eq!(
            post_crumbs(&tree, &categories, None, Visibility::Public, &category_url),
            None
        );

        let crumbs = post_crumbs(&tree, &categories, None, Visibility::Admin, &category_url)
            .unwrap()
            .unwrap();
        assert_eq!(
            crumbs
                .iter()
                .map(|crumb| crumb.label.as_str())
                .collect::<Vec<_>>(),
            vec!["Life", "Travel"]
        );
    }

    #[test]
    fn test_post_crumbs_ignores_tags() {
        let tree = tree();
        let taxonomies: Vec<TaxonomyId> = vec!["6".into(), "2".into()];

        let crumbs = post_crumbs(&tree, &taxonomies, None, Visibility::Public, &category_url)
            .unwrap()
            .unwrap();
        assert_eq!(
            crumbs.current().map(|crumb| crumb.label.as_str()),
            Some("Programming")
        );

        let crumbs = post_crumbs(
            &tree,
            &taxonomies,
            Some("https://example.com/tag/rust-tag"),
            Visibility::Public,
            &category_url,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            crumbs.current().map(|crumb| crumb.label.as_str()),
            Some("Programming")
        );

        let tags_only: Vec<TaxonomyId> = vec!["6".into()];
        assert_eq!(
            post_crumbs(&tree, &tags_only, None, Visibility::Public, &category_url),
            None
        );
    }
}
