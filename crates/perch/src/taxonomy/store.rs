use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::taxonomy::{TaxonomyNode, TaxonomyType};

/// A source of full taxonomy snapshots.
pub trait TaxonomyStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns every taxonomy node, of every type.
    fn fetch_all(&self) -> Result<Vec<TaxonomyNode>, Self::Error>;

    /// Returns every taxonomy node of the given type.
    fn fetch_by_type(&self, taxonomy_type: TaxonomyType) -> Result<Vec<TaxonomyNode>, Self::Error> {
        Ok(self
            .fetch_all()?
            .into_iter()
            .filter(|node| node.taxonomy_type == taxonomy_type)
            .collect())
    }
}

/// A store that reads a JSON array of taxonomy nodes from disk on every fetch.
pub struct JsonTaxonomyStore {
    path: PathBuf,
}

impl JsonTaxonomyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[derive(Error, Debug)]
pub enum JsonStoreError {
    #[error("failed to read taxonomy snapshot: {0}")]
    Io(#[from] io::Error),

    #[error("invalid taxonomy snapshot in '{filepath}': {source}")]
    InvalidSnapshot {
        filepath: PathBuf,
        source: serde_json::Error,
    },
}

impl TaxonomyStore for JsonTaxonomyStore {
    type Error = JsonStoreError;

    fn fetch_all(&self) -> Result<Vec<TaxonomyNode>, Self::Error> {
        let contents = fs::read_to_string(&self.path)?;

        serde_json::from_str(&contents).map_err(|source| JsonStoreError::InvalidSnapshot {
            filepath: self.path.clone(),
            source,
        })
    }
}

/// A store backed by a shared, in-memory list of nodes.
#[derive(Clone, Default)]
pub struct InMemoryTaxonomyStore {
    nodes: Arc<RwLock<Vec<TaxonomyNode>>>,
}

#[derive(Error, Debug)]
pub enum InMemoryStoreError {
    #[error("in-memory taxonomy store lock poisoned")]
    Poisoned,
}

impl InMemoryTaxonomyStore {
    pub fn new(nodes: Vec<TaxonomyNode>) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Replaces the stored nodes wholesale.
    pub fn replace(&self, nodes: Vec<TaxonomyNode>) -> Result<(), InMemoryStoreError> {
        *self
            .nodes
            .write()
            .map_err(|_| InMemoryStoreError::Poisoned)? = nodes;

        Ok(())
    }
}

impl TaxonomyStore for InMemoryTaxonomyStore {
    type Error = InMemoryStoreError;

    fn fetch_all(&self) -> Result<Vec<TaxonomyNode>, Self::Error> {
        Ok(self
            .nodes
            .read()
            .map_err(|_| InMemoryStoreError::Poisoned)?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_in_memory_fetch_by_type() {
        let store = InMemoryTaxonomyStore::new(vec![
            TaxonomyNode::new("1", TaxonomyType::Post, "rust", "Rust"),
            TaxonomyNode::new("2", TaxonomyType::Tag, "async", "Async"),
        ]);

        let tags = store.fetch_by_type(TaxonomyType::Tag).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "async");

        store.replace(Vec::new()).unwrap();
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_poisoned_error_names_the_lock() {
        assert_eq!(
            InMemoryStoreError::Poisoned.to_string(),
            "in-memory taxonomy store lock poisoned"
        );
    }

    #[test]
    fn test_json_store() {
        let path = env::temp_dir().join(format!("perch-store-{}.json", std::process::id()));
        fs::write(
            &path,
            indoc! {r#"
                [
                    { "id": "1", "type": "post", "slug": "tech", "name": "Tech" },
                    { "id": "2", "type": "post", "slug": "rust", "name": "Rust", "parent": "1" }
                ]
            "#},
        )
        .unwrap();

        let store = JsonTaxonomyStore::new(&path);
        let nodes = store.fetch_all().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            nodes
                .iter()
                .map(|node| node.slug.as_str())
                .collect::<Vec<_>>(),
            vec!["tech", "rust"]
        );
    }

    #[test]
    fn test_json_store_missing_file() {
        let store = JsonTaxonomyStore::new("/definitely/not/here.json");

        assert!(matches!(store.fetch_all(), Err(JsonStoreError::Io(_))));
    }
}
