use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::{SheetError, SheetStore, Table};

/// Read-through cache in front of a worksheet backend.
///
/// Reads are served from memory for `ttl`; any write to a sheet drops that
/// sheet's entry so the next read goes back to the source. A zero TTL turns
/// caching off.
pub struct CachedStore<S> {
    inner: S,
    tables: Option<Cache<String, Arc<Table>>>,
}

impl<S: SheetStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        let tables = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(64) // one entry per worksheet
                .time_to_live(ttl)
                .build()
        });

        Self { inner, tables }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn invalidate(&self, sheet: &str) {
        if let Some(tables) = &self.tables {
            tables.invalidate(sheet).await;
        }
    }
}

#[async_trait]
impl<S: SheetStore> SheetStore for CachedStore<S> {
    async fn read(&self, sheet: &str) -> Result<Table, SheetError> {
        let Some(tables) = &self.tables else {
            return self.inner.read(sheet).await;
        };

        if let Some(hit) = tables.get(sheet).await {
            debug!(sheet, "Worksheet cache hit");
            return Ok(hit.as_ref().clone());
        }

        let table = self.inner.read(sheet).await?;
        tables
            .insert(sheet.to_string(), Arc::new(table.clone()))
            .await;
        Ok(table)
    }

    async fn read_fresh(&self, sheet: &str) -> Result<Table, SheetError> {
        self.invalidate(sheet).await;
        self.read(sheet).await
    }

    async fn append(
        &self,
        sheet: &str,
        headers: &[String],
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetError> {
        let result = self.inner.append(sheet, headers, rows).await;
        self.invalidate(sheet).await;
        result
    }

    async fn update_row(
        &self,
        sheet: &str,
        index: usize,
        values: Vec<String>,
    ) -> Result<(), SheetError> {
        let result = self.inner.update_row(sheet, index, values).await;
        self.invalidate(sheet).await;
        result
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), SheetError> {
        let result = self.inner.delete_row(sheet, index).await;
        self.invalidate(sheet).await;
        result
    }

    async fn ensure_headers(&self, sheet: &str, headers: &[String]) -> Result<(), SheetError> {
        let result = self.inner.ensure_headers(sheet, headers).await;
        self.invalidate(sheet).await;
        result
    }
}
