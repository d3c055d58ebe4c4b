use std::collections::BTreeSet;

use derive_more::{Deref, IntoIterator};

use crate::taxonomy::path::is_visible_with_ancestors;
use crate::taxonomy::{
    NotFoundError, TaxonomyId, TaxonomyNode, TaxonomyTree, TaxonomyType, Visibility,
};

/// A node's own id plus the ids of all of its visible descendants.
#[derive(Debug, PartialEq, Eq, Clone, Default, Deref, IntoIterator)]
pub struct DescendantIds(BTreeSet<TaxonomyId>);

impl FromIterator<TaxonomyId> for DescendantIds {
    fn from_iter<T: IntoIterator<Item = TaxonomyId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A node together with everything beneath it.
#[derive(Debug)]
pub struct Subtree<'a> {
    pub root: &'a TaxonomyNode,
    pub descendant_ids: DescendantIds,
    /// The same ids as `descendant_ids`, in depth-first sibling order.
    pub ordered_ids: Vec<TaxonomyId>,
}

/// Resolves the node of the given type with the given slug, along with all
/// of its descendants.
///
/// For [`Visibility::Public`], a hidden node hides its whole subtree: a hidden
/// root (or a root under a hidden ancestor) is not found, and hidden
/// descendants are left out together with everything beneath them.
pub fn resolve_subtree<'a>(
    tree: &'a TaxonomyTree,
    slug: &str,
    taxonomy_type: TaxonomyType,
    visibility: Visibility,
) -> Result<Subtree<'a>, NotFoundError> {
    let root = tree
        .get_by_slug(taxonomy_type, slug)
        .filter(|root| is_visible_with_ancestors(tree, root, visibility))
        .ok_or_else(|| NotFoundError(slug.to_string()))?;

    let mut ordered_ids = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        ordered_ids.push(node.id.clone());

        stack.extend(
            tree.child_nodes(&node.id)
                .filter(|child| child.is_visible_to(visibility))
                .collect::<Vec<_>>()
                .into_iter()
                .rev(),
        );
    }

    Ok(Subtree {
        root,
        descendant_ids: ordered_ids.iter().cloned().collect(),
        ordered_ids,
    })
}
