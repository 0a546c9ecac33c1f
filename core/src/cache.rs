use crate::catalog::Catalog;
use crate::index::{build_index, DocumentIndex};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the index for the catalog currently being served.
///
/// The catalog length is the staleness key: when it differs from the cached
/// index's `total_documents` the index is rebuilt from scratch. Rebuilds are
/// serialized by `rebuild_gate`; readers only ever see a fully built index.
#[derive(Default)]
pub struct IndexCache {
    current: RwLock<Option<Arc<DocumentIndex>>>,
    rebuild_gate: Mutex<()>,
    rebuilds: AtomicU64,
}

impl IndexCache {
    pub fn new() -> Self { Self::default() }

    /// The cached index, if any, regardless of staleness.
    pub fn current(&self) -> Option<Arc<DocumentIndex>> { self.current.read().clone() }

    fn fresh(&self, catalog: &Catalog) -> Option<Arc<DocumentIndex>> {
        self.current
            .read()
            .as_ref()
            .filter(|idx| idx.total_documents == catalog.len())
            .cloned()
    }

    /// Return the cached index, rebuilding it first if it is missing or stale.
    pub fn rebuild_if_stale(&self, catalog: &Catalog) -> Arc<DocumentIndex> {
        if let Some(idx) = self.fresh(catalog) { return idx; }

        let _gate = self.rebuild_gate.lock();
        // Another caller may have rebuilt while we waited.
        if let Some(idx) = self.fresh(catalog) { return idx; }

        let stale = self.current.read().as_ref().map(|idx| idx.total_documents);
        tracing::info!(?stale, documents = catalog.len(), "rebuilding document index");
        let idx = Arc::new(build_index(catalog));
        *self.current.write() = Some(Arc::clone(&idx));
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        idx
    }

    /// Alias of [`rebuild_if_stale`](Self::rebuild_if_stale) for read paths.
    pub fn get_or_build(&self, catalog: &Catalog) -> Arc<DocumentIndex> { self.rebuild_if_stale(catalog) }

    /// Drop the cached index so the next lookup rebuilds it.
    pub fn invalidate(&self) {
        let _gate = self.rebuild_gate.lock();
        *self.current.write() = None;
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 { self.rebuilds.load(Ordering::Relaxed) }
}
