use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::taxonomy::{StructuralError, TaxonomyStore, TaxonomyTree};

#[derive(Error, Debug)]
pub enum RefreshError<E: std::error::Error + 'static> {
    #[error("failed to fetch taxonomy snapshot: {0}")]
    Store(#[source] E),

    #[error("rejected taxonomy snapshot: {0}")]
    Structural(#[from] StructuralError),

    #[error("taxonomy snapshot lock poisoned")]
    Poisoned,
}

/// Owns the published [`TaxonomyTree`] and rebuilds it from the store after
/// the taxonomy data changes.
///
/// Readers get an `Arc` to an immutable tree. A rebuild publishes a new tree
/// by swapping the `Arc`; trees already handed out stay valid. A snapshot
/// that fails to build is never published.
pub struct TaxonomyCache<S> {
    store: S,
    current: RwLock<Option<Arc<TaxonomyTree>>>,
    stale: AtomicBool,
    rebuild: Mutex<()>,
}

impl<S> TaxonomyCache<S>
where
    S: TaxonomyStore,
{
    /// Returns a new [`TaxonomyCache`]. Nothing is fetched until the first read.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: RwLock::new(None),
            stale: AtomicBool::new(true),
            rebuild: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Marks the published tree as out of date, so the next read rebuilds it.
    ///
    /// Call this after any create, update, delete, or re-parent.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
        debug!("taxonomy snapshot invalidated");
    }

    /// Returns the published tree without rebuilding.
    pub fn current(&self) -> Result<Option<Arc<TaxonomyTree>>, RefreshError<S::Error>> {
        Ok(self
            .current
            .read()
            .map_err(|_| RefreshError::Poisoned)?
            .clone())
    }

    /// Returns the tree to read from, rebuilding it first if it is out of date.
    ///
    /// When the rebuild fails but an earlier tree was published, the failure
    /// is logged and the earlier tree is returned.
    pub fn snapshot(&self) -> Result<Arc<TaxonomyTree>, RefreshError<S::Error>> {
        if !self.stale.load(Ordering::Acquire) {
            if let Some(tree) = self.current()? {
                return Ok(tree);
            }
        }

        let _guard = self.rebuild.lock().map_err(|_| RefreshError::Poisoned)?;

        // Another reader may have rebuilt while we waited for the lock.
        if !self.stale.load(Ordering::Acquire) {
            if let Some(tree) = self.current()? {
                return Ok(tree);
            }
        }

        match self.rebuild_locked() {
            Ok(tree) => Ok(tree),
            Err(err) => match self.current()? {
                Some(previous) => {
                    error!(error = %err, "taxonomy rebuild failed, serving previous snapshot");
                    Ok(previous)
                }
                None => Err(err),
            },
        }
    }

    /// Rebuilds and publishes the tree now.
    ///
    /// On failure the error is returned and the previously published tree,
    /// if any, stays in place.
    pub fn refresh(&self) -> Result<Arc<TaxonomyTree>, RefreshError<S::Error>> {
        let _guard = self.rebuild.lock().map_err(|_| RefreshError::Poisoned)?;

        self.rebuild_locked()
    }

    fn rebuild_locked(&self) -> Result<Arc<TaxonomyTree>, RefreshError<S::Error>> {
        // Cleared before fetching so an invalidation racing the fetch is kept.
        self.stale.store(false, Ordering::Release);

        let nodes = match self.store.fetch_all() {
            Ok(nodes) => nodes,
            Err(err) => {
                // Retried on the next read.
                self.stale.store(true, Ordering::Release);
                return Err(RefreshError::Store(err));
            }
        };
        let tree = Arc::new(TaxonomyTree::build(nodes)?);

        *self.current.write().map_err(|_| RefreshError::Poisoned)? = Some(tree.clone());

        info!(nodes = tree.len(), "published taxonomy snapshot");

        Ok(tree)
    }
}
