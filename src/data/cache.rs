//! Table Cache Module
//! Read-through memoization of the loader, keyed by input paths and file
//! modification times.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::debug;

use super::loader::{load_tables, LoadError, LoadedTables};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    rfm: PathBuf,
    transactions: PathBuf,
    rfm_mtime: SystemTime,
    transactions_mtime: SystemTime,
}

/// Caches loaded tables so repeated renders with unchanged inputs skip the
/// file reads entirely. Editing either input file changes its modification
/// time and invalidates the entry. Load failures are never cached.
///
/// The lock is held across the load itself, so concurrent callers asking for
/// the same inputs trigger a single read.
#[derive(Default)]
pub struct TableCache {
    entries: Mutex<HashMap<CacheKey, Arc<LoadedTables>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tables for this pair of inputs, loading them on
    /// first access or after either file changed on disk.
    pub fn get_or_load(
        &self,
        rfm_path: &str,
        transactions_path: &str,
    ) -> Result<Arc<LoadedTables>, LoadError> {
        let key = CacheKey {
            rfm: PathBuf::from(rfm_path),
            transactions: PathBuf::from(transactions_path),
            rfm_mtime: mtime(rfm_path)?,
            transactions_mtime: mtime(transactions_path)?,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = entries.get(&key) {
            debug!(rfm = rfm_path, transactions = transactions_path, "table cache hit");
            return Ok(Arc::clone(hit));
        }

        debug!(rfm = rfm_path, transactions = transactions_path, "table cache miss");
        let tables = Arc::new(load_tables(rfm_path, transactions_path)?);

        // Superseded entries for the same paths only differ by mtime.
        entries.retain(|k, _| k.rfm != key.rfm || k.transactions != key.transactions);
        entries.insert(key, Arc::clone(&tables));
        Ok(tables)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

fn mtime(path: &str) -> Result<SystemTime, LoadError> {
    Ok(std::fs::metadata(Path::new(path))?.modified()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture() -> (NamedTempFile, NamedTempFile) {
        let mut rfm = NamedTempFile::new().unwrap();
        writeln!(rfm, "CustomerID,Recency,Frequency,Monetary").unwrap();
        writeln!(rfm, "1,10,2,100.0").unwrap();

        let mut tx = NamedTempFile::new().unwrap();
        writeln!(tx, "InvoiceNo,InvoiceDate").unwrap();
        writeln!(tx, "536365,2010-12-01 08:26:00").unwrap();

        (rfm, tx)
    }

    #[test]
    fn second_access_is_served_from_cache() {
        let (rfm, tx) = fixture();
        let rfm_path = rfm.path().to_str().unwrap();
        let tx_path = tx.path().to_str().unwrap();

        let cache = TableCache::new();
        let first = cache.get_or_load(rfm_path, tx_path).unwrap();
        let second = cache.get_or_load(rfm_path, tx_path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear();
        let third = cache.get_or_load(rfm_path, tx_path).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn missing_file_fails_without_caching() {
        let (_, tx) = fixture();
        let cache = TableCache::new();
        let result = cache.get_or_load("/nonexistent/rfm.csv", tx.path().to_str().unwrap());
        assert!(result.is_err());
    }
}
