use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::taxonomy::{
    sort_siblings, TaxonomyId, TaxonomyNode, TaxonomyStatus, TaxonomyType, Visibility,
};

/// The snapshot violates the shape of a taxonomy forest.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum StructuralError {
    #[error("duplicate taxonomy id '{id}'")]
    DuplicateId { id: TaxonomyId },

    #[error("{taxonomy_type} slug '{slug}' is used by both '{first}' and '{second}'")]
    DuplicateSlug {
        taxonomy_type: TaxonomyType,
        slug: String,
        first: TaxonomyId,
        second: TaxonomyId,
    },

    #[error("taxonomy '{id}' references missing parent '{parent}'")]
    MissingParent { id: TaxonomyId, parent: TaxonomyId },

    #[error("{taxonomy_type} '{id}' has parent '{parent}' of another type ({parent_type})")]
    CrossTypeParent {
        id: TaxonomyId,
        taxonomy_type: TaxonomyType,
        parent: TaxonomyId,
        parent_type: TaxonomyType,
    },

    #[error("{taxonomy_type} '{id}' cannot have a parent")]
    NotHierarchical {
        id: TaxonomyId,
        taxonomy_type: TaxonomyType,
    },

    #[error("taxonomy '{id}' is part of a parent cycle")]
    Cycle { id: TaxonomyId },
}

/// An immutable forest of taxonomy nodes, built from a full snapshot.
#[derive(Debug, Default)]
pub struct TaxonomyTree {
    /// Every node, in depth-first tree order.
    nodes: IndexMap<TaxonomyId, TaxonomyNode>,
    children: HashMap<TaxonomyId, Vec<TaxonomyId>>,
    roots: HashMap<TaxonomyType, Vec<TaxonomyId>>,
    slugs: HashMap<(TaxonomyType, String), TaxonomyId>,
}

impl TaxonomyTree {
    /// Builds a tree from a flat snapshot of taxonomy nodes.
    pub fn build(
        nodes: impl IntoIterator<Item = TaxonomyNode>,
    ) -> Result<Self, StructuralError> {
        let mut by_id = HashMap::new();
        let mut input_order = Vec::new();

        for node in nodes {
            if by_id.contains_key(&node.id) {
                return Err(StructuralError::DuplicateId { id: node.id });
            }

            input_order.push(node.id.clone());
            by_id.insert(node.id.clone(), node);
        }

        let slugs = index_slugs(&by_id, &input_order)?;
        validate_parents(&by_id, &input_order)?;
        check_acyclic(&by_id, &input_order)?;

        let (roots, children) = group_siblings(&by_id);

        let mut taxonomy_types = roots.keys().copied().collect::<Vec<_>>();
        taxonomy_types.sort();

        let mut tree_order = Vec::with_capacity(by_id.len());
        for taxonomy_type in taxonomy_types {
            for root in &roots[&taxonomy_type] {
                let mut stack = vec![root];
                while let Some(id) = stack.pop() {
                    tree_order.push(id.clone());

                    if let Some(child_ids) = children.get(id) {
                        stack.extend(child_ids.iter().rev());
                    }
                }
            }
        }

        let nodes = tree_order
            .into_iter()
            .filter_map(|id| by_id.remove_entry(&id))
            .collect::<IndexMap<_, _>>();

        let tree = Self {
            nodes,
            children,
            roots,
            slugs,
        };

        debug!(
            nodes = tree.len(),
            roots = tree.roots.values().map(Vec::len).sum::<usize>(),
            "built taxonomy tree"
        );

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &TaxonomyId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &TaxonomyId) -> Option<&TaxonomyNode> {
        self.nodes.get(id)
    }

    /// Returns the node of the given type with the given slug.
    pub fn get_by_slug(&self, taxonomy_type: TaxonomyType, slug: &str) -> Option<&TaxonomyNode> {
        self.slugs
            .get(&(taxonomy_type, slug.to_string()))
            .and_then(|id| self.nodes.get(id))
    }

    pub fn parent(&self, id: &TaxonomyId) -> Option<&TaxonomyNode> {
        self.nodes
            .get(id)
            .and_then(|node| node.parent.as_ref())
            .and_then(|parent| self.nodes.get(parent))
    }

    /// Returns the ids of the node's children, in sibling order.
    pub fn children(&self, id: &TaxonomyId) -> &[TaxonomyId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn child_nodes<'a>(
        &'a self,
        id: &TaxonomyId,
    ) -> impl Iterator<Item = &'a TaxonomyNode> + 'a {
        self.children(id)
            .iter()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Returns the ids of the root nodes of the given type, in sibling order.
    pub fn roots(&self, taxonomy_type: TaxonomyType) -> &[TaxonomyId] {
        self.roots
            .get(&taxonomy_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over every node in depth-first tree order.
    pub fn iter(&self) -> impl Iterator<Item = &TaxonomyNode> {
        self.nodes.values()
    }

    /// Returns whether `ancestor` lies on the parent chain of `id`.
    ///
    /// A node is not its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: &TaxonomyId, id: &TaxonomyId) -> bool {
        let mut current = self.get(id).and_then(|node| node.parent.as_ref());
        let mut steps = 0;

        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }

            steps += 1;
            if steps > self.len() {
                return false;
            }

            current = self.get(parent).and_then(|node| node.parent.as_ref());
        }

        false
    }

    /// Returns the nodes of the given type in depth-first tree order, paired
    /// with their depth (roots are at depth 0).
    ///
    /// For [`Visibility::Public`], hidden nodes are skipped along with their
    /// entire subtree.
    pub fn walk(
        &self,
        taxonomy_type: TaxonomyType,
        visibility: Visibility,
    ) -> Vec<(usize, &TaxonomyNode)> {
        let mut walked = Vec::new();
        let mut stack = self
            .roots(taxonomy_type)
            .iter()
            .rev()
            .map(|id| (0, id))
            .collect::<Vec<_>>();

        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };

            if !node.is_visible_to(visibility) {
                continue;
            }

            walked.push((depth, node));
            stack.extend(
                self.children(id)
                    .iter()
                    .rev()
                    .map(|child| (depth + 1, child)),
            );
        }

        walked
    }

    /// Returns the required nodes, which the editing surface must not remove.
    pub fn required(&self) -> impl Iterator<Item = &TaxonomyNode> {
        self.iter()
            .filter(|node| node.status == TaxonomyStatus::Required)
    }
}

fn index_slugs(
    by_id: &HashMap<TaxonomyId, TaxonomyNode>,
    input_order: &[TaxonomyId],
) -> Result<HashMap<(TaxonomyType, String), TaxonomyId>, StructuralError> {
    let mut slugs = HashMap::with_capacity(input_order.len());

    for node in input_order.iter().filter_map(|id| by_id.get(id)) {
        let key = (node.taxonomy_type, node.slug.clone());
        if let Some(first) = slugs.get(&key) {
            return Err(StructuralError::DuplicateSlug {
                taxonomy_type: node.taxonomy_type,
                slug: node.slug.clone(),
                first: TaxonomyId::clone(first),
                second: node.id.clone(),
            });
        }

        slugs.insert(key, node.id.clone());
    }

    Ok(slugs)
}

fn validate_parents(
    by_id: &HashMap<TaxonomyId, TaxonomyNode>,
    input_order: &[TaxonomyId],
) -> Result<(), StructuralError> {
    for node in input_order.iter().filter_map(|id| by_id.get(id)) {
        let Some(parent_id) = node.parent.as_ref() else {
            continue;
        };

        if !node.taxonomy_type.is_hierarchical() {
            return Err(StructuralError::NotHierarchical {
                id: node.id.clone(),
                taxonomy_type: node.taxonomy_type,
            });
        }

        let parent = by_id
            .get(parent_id)
            .ok_or_else(|| StructuralError::MissingParent {
                id: node.id.clone(),
                parent: parent_id.clone(),
            })?;

        if parent.taxonomy_type != node.taxonomy_type {
            return Err(StructuralError::CrossTypeParent {
                id: node.id.clone(),
                taxonomy_type: node.taxonomy_type,
                parent: parent_id.clone(),
                parent_type: parent.taxonomy_type,
            });
        }
    }

    Ok(())
}

/// Walks every node's parent chain, stopping as soon as it reaches a node
/// already proven to lead to a root.
///
/// A walk that takes more steps than there are nodes has to be going round
/// in a circle.
fn check_acyclic(
    by_id: &HashMap<TaxonomyId, TaxonomyNode>,
    input_order: &[TaxonomyId],
) -> Result<(), StructuralError> {
    let mut proven = HashSet::with_capacity(by_id.len());

    for id in input_order {
        let mut chain = Vec::new();
        let mut current = Some(id);

        while let Some(current_id) = current {
            if proven.contains(current_id) {
                break;
            }

            if chain.len() > by_id.len() {
                return Err(StructuralError::Cycle {
                    id: current_id.clone(),
                });
            }

            chain.push(current_id);
            current = by_id.get(current_id).and_then(|node| node.parent.as_ref());
        }

        proven.extend(chain);
    }

    Ok(())
}

fn group_siblings(
    by_id: &HashMap<TaxonomyId, TaxonomyNode>,
) -> (
    HashMap<TaxonomyType, Vec<TaxonomyId>>,
    HashMap<TaxonomyId, Vec<TaxonomyId>>,
) {
    let mut roots: HashMap<TaxonomyType, Vec<&TaxonomyNode>> = HashMap::new();
    let mut children: HashMap<TaxonomyId, Vec<&TaxonomyNode>> = HashMap::new();

    for node in by_id.values() {
        match node.parent.as_ref() {
            Some(parent) => children.entry(parent.clone()).or_default().push(node),
            None => roots.entry(node.taxonomy_type).or_default().push(node),
        }
    }

    fn into_ids<K>(groups: HashMap<K, Vec<&TaxonomyNode>>) -> HashMap<K, Vec<TaxonomyId>>
    where
        K: std::hash::Hash + Eq,
    {
        groups
            .into_iter()
            .map(|(key, mut siblings)| {
                sort_siblings(&mut siblings);
                let ids = siblings.iter().map(|node| node.id.clone()).collect();
                (key, ids)
            })
            .collect()
    }

    (into_ids(roots), into_ids(children))
}
