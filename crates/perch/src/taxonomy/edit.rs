//! Checks an editing surface runs before writing a taxonomy mutation.
//!
//! A built [`TaxonomyTree`] is never changed in place. Instead, the proposed
//! change is checked against the current tree, written to the store, and the
//! cache is invalidated so the next read rebuilds.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::taxonomy::{TaxonomyId, TaxonomyStatus, TaxonomyTree, TaxonomyType};

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| {
        Regex::new(r"^[\p{L}\p{N}]+(?:[-_][\p{L}\p{N}]+)*$")
            .expect("failed to compile regex for taxonomy slugs")
    })
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum EditError {
    #[error("taxonomy '{0}' does not exist")]
    NotFound(TaxonomyId),

    #[error("parent taxonomy '{0}' does not exist")]
    ParentNotFound(TaxonomyId),

    #[error("'{0}' is required and its parent cannot change")]
    RequiredCannotBeReparented(TaxonomyId),

    #[error("'{0}' is required and cannot be deleted")]
    RequiredCannotBeDeleted(TaxonomyId),

    #[error("{0}s cannot be nested")]
    NotHierarchical(TaxonomyType),

    #[error("a {child_type} cannot be placed under a {parent_type}")]
    CrossTypeParent {
        child_type: TaxonomyType,
        parent_type: TaxonomyType,
    },

    #[error("'{parent}' is '{id}' or one of its descendants")]
    WouldCreateCycle { id: TaxonomyId, parent: TaxonomyId },

    #[error("'{0}' is not published and cannot take children")]
    ParentNotPublished(TaxonomyId),

    #[error("'{id}' still has {count} related items")]
    HasRelatedContent { id: TaxonomyId, count: u64 },

    #[error("'{0}' still has child taxonomies")]
    HasChildren(TaxonomyId),

    #[error("'{0}' is not a valid slug")]
    InvalidSlug(String),

    #[error("{taxonomy_type} '{slug}' already exists")]
    SlugTaken {
        taxonomy_type: TaxonomyType,
        slug: String,
    },
}

/// Checks that `id` may be moved under `new_parent` (`None` moves it to the
/// root).
pub fn check_parent_change(
    tree: &TaxonomyTree,
    id: &TaxonomyId,
    new_parent: Option<&TaxonomyId>,
) -> Result<(), EditError> {
    let node = tree
        .get(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;

    if node.parent.as_ref() == new_parent {
        return Ok(());
    }

    if node.is_required() {
        return Err(EditError::RequiredCannotBeReparented(id.clone()));
    }

    let Some(new_parent) = new_parent else {
        return Ok(());
    };

    check_new_child(tree, node.taxonomy_type, new_parent)?;

    if new_parent == id || tree.is_ancestor_of(id, new_parent) {
        return Err(EditError::WouldCreateCycle {
            id: id.clone(),
            parent: new_parent.clone(),
        });
    }

    Ok(())
}

/// Checks that a new node of the given type may be created under `parent`.
pub fn check_new_child(
    tree: &TaxonomyTree,
    taxonomy_type: TaxonomyType,
    parent: &TaxonomyId,
) -> Result<(), EditError> {
    if !taxonomy_type.is_hierarchical() {
        return Err(EditError::NotHierarchical(taxonomy_type));
    }

    let parent_node = tree
        .get(parent)
        .ok_or_else(|| EditError::ParentNotFound(parent.clone()))?;

    if parent_node.taxonomy_type != taxonomy_type {
        return Err(EditError::CrossTypeParent {
            child_type: taxonomy_type,
            parent_type: parent_node.taxonomy_type,
        });
    }

    if parent_node.status == TaxonomyStatus::Hidden {
        return Err(EditError::ParentNotPublished(parent.clone()));
    }

    Ok(())
}

/// Checks that `id` may be deleted.
pub fn check_delete(tree: &TaxonomyTree, id: &TaxonomyId) -> Result<(), EditError> {
    let node = tree
        .get(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;

    if node.is_required() {
        return Err(EditError::RequiredCannotBeDeleted(id.clone()));
    }

    if node.count > 0 {
        return Err(EditError::HasRelatedContent {
            id: id.clone(),
            count: node.count,
        });
    }

    if !tree.children(id).is_empty() {
        return Err(EditError::HasChildren(id.clone()));
    }

    Ok(())
}

/// Checks that `slug` is well-formed and not used by another node of the
/// same type. `except` is the node being edited, if any.
pub fn check_slug(
    tree: &TaxonomyTree,
    taxonomy_type: TaxonomyType,
    slug: &str,
    except: Option<&TaxonomyId>,
) -> Result<(), EditError> {
    if !slug_regex().is_match(slug) {
        return Err(EditError::InvalidSlug(slug.to_string()));
    }

    match tree.get_by_slug(taxonomy_type, slug) {
        Some(existing) if Some(&existing.id) != except => Err(EditError::SlugTaken {
            taxonomy_type,
            slug: slug.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Returns a slug derived from a taxonomy's display name.
pub fn suggest_slug(name: &str) -> String {
    slug::slugify(name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::taxonomy::TaxonomyNode;

    use super::*;

    fn tree() -> TaxonomyTree {
        TaxonomyTree::build(vec![
            TaxonomyNode::new("root", TaxonomyType::Post, "root", "Root"),
            TaxonomyNode::new("cat", TaxonomyType::Post, "cat", "Cat").with_parent("root"),
            TaxonomyNode::new("subcat", TaxonomyType::Post, "subcat", "Subcat")
                .with_parent("cat")
                .with_count(3),
            TaxonomyNode::new("uncategorized", TaxonomyType::Post, "uncategorized", "Misc")
                .with_status(TaxonomyStatus::Required),
            TaxonomyNode::new("drafts", TaxonomyType::Post, "drafts", "Drafts")
                .with_status(TaxonomyStatus::Hidden),
            TaxonomyNode::new("empty", TaxonomyType::Post, "empty", "Empty"),
            TaxonomyNode::new("rust", TaxonomyType::Tag, "rust", "Rust"),
            TaxonomyNode::new("friends", TaxonomyType::Link, "friends", "Friends"),
        ])
        .unwrap()
    }

    #[test]
    fn test_reparent_under_descendant_is_a_cycle() {
        let tree = tree();

        assert_eq!(
            check_parent_change(&tree, &"root".into(), Some(&"subcat".into())),
            Err(EditError::WouldCreateCycle {
                id: "root".into(),
                parent: "subcat".into()
            })
        );
        assert_eq!(
            check_parent_change(&tree, &"cat".into(), Some(&"cat".into())),
            Err(EditError::WouldCreateCycle {
                id: "cat".into(),
                parent: "cat".into()
            })
        );
    }

    #[test]
    fn test_reparent_rules() {
        let tree = tree();

        assert_eq!(
            check_parent_change(&tree, &"subcat".into(), Some(&"empty".into())),
            Ok(())
        );
        assert_eq!(check_parent_change(&tree, &"subcat".into(), None), Ok(()));
        assert_eq!(
            check_parent_change(&tree, &"uncategorized".into(), Some(&"root".into())),
            Err(EditError::RequiredCannotBeReparented("uncategorized".into()))
        );
        assert_eq!(
            check_parent_change(&tree, &"cat".into(), Some(&"drafts".into())),
            Err(EditError::ParentNotPublished("drafts".into()))
        );
        assert_eq!(
            check_parent_change(&tree, &"cat".into(), Some(&"friends".into())),
            Err(EditError::CrossTypeParent {
                child_type: TaxonomyType::Post,
                parent_type: TaxonomyType::Link
            })
        );
        assert_eq!(
            check_parent_change(&tree, &"rust".into(), Some(&"root".into())),
            Err(EditError::NotHierarchical(TaxonomyType::Tag))
        );
        assert_eq!(
            check_parent_change(&tree, &"cat".into(), Some(&"gone".into())),
            Err(EditError::ParentNotFound("gone".into()))
        );
    }

    #[test]
    fn test_unchanged_parent_is_allowed_for_required() {
        let tree = tree();

        assert_eq!(
            check_parent_change(&tree, &"uncategorized".into(), None),
            Ok(())
        );
    }

    #[test]
    fn test_delete_rules() {
        let tree = tree();

        assert_eq!(check_delete(&tree, &"empty".into()), Ok(()));
        assert_eq!(
            check_delete(&tree, &"uncategorized".into()),
            Err(EditError::RequiredCannotBeDeleted("uncategorized".into()))
        );
        assert_eq!(
            check_delete(&tree, &"subcat".into()),
            Err(EditError::HasRelatedContent {
                id: "subcat".into(),
                count: 3
            })
        );
        assert_eq!(
            check_delete(&tree, &"cat".into()),
            Err(EditError::HasChildren("cat".into()))
        );
        assert_eq!(
            check_delete(&tree, &"nope".into()),
            Err(EditError::NotFound("nope".into()))
        );
    }

    #[test]
    fn test_slug_rules() {
        let tree = tree();

        assert_eq!(check_slug(&tree, TaxonomyType::Post, "new-one", None), Ok(()));
        assert_eq!(check_slug(&tree, TaxonomyType::Post, "编程", None), Ok(()));
        assert_eq!(
            check_slug(&tree, TaxonomyType::Post, "cat", Some(&"cat".into())),
            Ok(())
        );
        assert_eq!(check_slug(&tree, TaxonomyType::Tag, "cat", None), Ok(()));
        assert_eq!(
            check_slug(&tree, TaxonomyType::Post, "cat", None),
            Err(EditError::SlugTaken {
                taxonomy_type: TaxonomyType::Post,
                slug: "cat".into()
            })
        );
        assert_eq!(
            check_slug(&tree, TaxonomyType::Post, "has space", None),
            Err(EditError::InvalidSlug("has space".into()))
        );
        assert_eq!(
            check_slug(&tree, TaxonomyType::Post, "", None),
            Err(EditError::InvalidSlug(String::new()))
        );
    }

    #[test]
    fn test_suggest_slug() {
        assert_eq!(suggest_slug("Hello, World!"), "hello-world");
    }
}
