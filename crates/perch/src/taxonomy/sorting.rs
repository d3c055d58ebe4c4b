use std::cmp::Ordering;

use crate::taxonomy::TaxonomyNode;

/// Orders siblings by `order` ascending, then by id ascending.
pub fn compare_siblings(a: &TaxonomyNode, b: &TaxonomyNode) -> Ordering {
    match a.order.cmp(&b.order) {
        Ordering::Equal => a.id.cmp(&b.id),
        ord => ord,
    }
}

/// Sorts the given siblings in place.
///
/// Ids are unique within a snapshot, so the order is total and an unstable
/// sort gives the same result on every rebuild.
pub fn sort_siblings(siblings: &mut [&TaxonomyNode]) {
    siblings.sort_unstable_by(|a, b| compare_siblings(a, b));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::taxonomy::TaxonomyType;

    use super::*;

    #[test]
    fn test_sort_siblings_by_order_then_id() {
        let nodes = vec![
            TaxonomyNode::new("c", TaxonomyType::Post, "c", "C").with_order(1),
            TaxonomyNode::new("b", TaxonomyType::Post, "b", "B").with_order(2),
            TaxonomyNode::new("a", TaxonomyType::Post, "a", "A").with_order(1),
            TaxonomyNode::new("d", TaxonomyType::Post, "d", "D").with_order(-5),
        ];

        let mut siblings = nodes.iter().collect::<Vec<_>>();
        sort_siblings(&mut siblings);

        assert_eq!(
            siblings
                .iter()
                .map(|node| node.id.as_str())
                .collect::<Vec<_>>(),
            vec!["d", "a", "c", "b"]
        );
    }
}
