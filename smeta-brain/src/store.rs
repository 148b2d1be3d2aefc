//! Consensus store
//!
//! Applies operator mutations to persisted items. Each mutation holds the
//! item's write lock and runs in one write transaction (`BEGIN IMMEDIATE`):
//! concurrent writers to the same item are serialized, writers to different
//! items queue on the database lock, and a failed mutation leaves the row as
//! it was. Reads take no lock.

use chrono::Utc;
use smeta_common::consensus::{
    self, CatalogRow, ConsensusItem, Dimension, ItemEdit, NewItem, RawRecord, RawRecordFields,
};
use smeta_common::{ConsensusConfig, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;

type LockMap = HashMap<Uuid, Arc<Mutex<()>>>;

/// Per-record write locks, keyed by guid
///
/// An entry lives only while someone holds or waits for it, so ids that are
/// never found (or deleted) leave nothing behind.
#[derive(Clone, Default)]
pub struct ItemLocks {
    locks: Arc<StdMutex<LockMap>>,
}

impl ItemLocks {
    /// Wait for exclusive write access to one record
    pub async fn acquire(&self, id: Uuid) -> ItemGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Sweep entries left behind by waiters whose request was cancelled
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        ItemGuard {
            id,
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of ids currently locked or awaited
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one record; released on drop
pub struct ItemGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        self.guard.take();

        // Handles are only cloned under the map lock: a count of 1 means the
        // map holds the last one and nobody is waiting
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

/// Persistent store of consensus items and raw records
#[derive(Clone)]
pub struct BrainStore {
    pool: SqlitePool,
    locks: ItemLocks,
    config: Arc<ConsensusConfig>,
}

impl BrainStore {
    pub fn new(pool: SqlitePool, config: ConsensusConfig) -> Self {
        Self {
            pool,
            locks: ItemLocks::default(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    // ========================================
    // Consensus items
    // ========================================

    pub async fn list_items(&self) -> Result<Vec<ConsensusItem>> {
        db::items::list(&self.pool).await
    }

    pub async fn get_item(&self, id: Uuid) -> Result<ConsensusItem> {
        let mut conn = self.pool.acquire().await?;
        db::items::fetch(&mut conn, id)
            .await?
            .ok_or_else(|| item_not_found(id))
    }

    /// Store a new item computed from upstream observations
    pub async fn create_item(&self, new_item: NewItem) -> Result<ConsensusItem> {
        let item = ConsensusItem::from_observations(new_item, &self.config)?;

        let mut conn = self.pool.acquire().await?;
        db::items::insert(&mut conn, &item).await?;

        info!(
            "Created item {} '{}' (material {}, work {})",
            item.id, item.name, item.material_price, item.work_price
        );
        Ok(item)
    }

    /// Merge a group of stored raw records into one new item
    pub async fn create_from_cluster(&self, record_ids: &[Uuid]) -> Result<ConsensusItem> {
        if record_ids.is_empty() {
            return Err(Error::Validation(
                "Cluster must contain at least one record".to_string(),
            ));
        }

        let mut tx = db::begin_write(&self.pool).await?;
        let mut records = Vec::with_capacity(record_ids.len());
        for id in record_ids {
            let record = db::raw_records::fetch(&mut tx, *id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Raw record {}", id)))?;
            records.push(record);
        }

        let item = ConsensusItem::from_cluster(&records, &self.config)?;
        db::items::insert(&mut tx, &item).await?;
        tx.commit().await?;

        info!(
            "Created item {} '{}' from cluster of {} records",
            item.id, item.name, item.cluster_size
        );
        Ok(item)
    }

    /// Remove one observed price and re-trim that dimension
    pub async fn remove_price(
        &self,
        id: Uuid,
        dimension: Dimension,
        price_index: usize,
    ) -> Result<ConsensusItem> {
        let config = Arc::clone(&self.config);
        let item = self
            .mutate_item(id, "remove_price", move |item| {
                consensus::remove_price(item, dimension, price_index, &config)
            })
            .await?;

        info!(
            "Removed {} price #{} from item {}: new price {}",
            dimension,
            price_index,
            id,
            item.price(dimension)
        );
        Ok(item)
    }

    /// Replace operator-editable fields directly
    pub async fn edit_item(&self, id: Uuid, edit: ItemEdit) -> Result<ConsensusItem> {
        let item = self
            .mutate_item(id, "edit_item", move |item| consensus::edit_item(item, &edit))
            .await?;

        info!("Edited item {} '{}'", id, item.name);
        Ok(item)
    }

    /// Set the trust flag for one dimension
    pub async fn approve(
        &self,
        id: Uuid,
        dimension: Dimension,
        approved: bool,
    ) -> Result<ConsensusItem> {
        let item = self
            .mutate_item(id, "approve", move |item| {
                consensus::approve(item, dimension, approved);
                Ok(())
            })
            .await?;

        info!("Item {} {} price approved = {}", id, dimension, approved);
        Ok(item)
    }

    /// Delete an item unconditionally
    pub async fn delete_item(&self, id: Uuid) -> Result<()> {
        let _guard = self.locks.acquire(id).await;

        let mut conn = self.pool.acquire().await?;
        if !db::items::delete(&mut conn, id).await? {
            return Err(item_not_found(id));
        }

        info!("Deleted item {}", id);
        Ok(())
    }

    /// Load, mutate and write back one item under its write lock
    async fn mutate_item<F>(&self, id: Uuid, operation: &str, apply: F) -> Result<ConsensusItem>
    where
        F: FnOnce(&mut ConsensusItem) -> Result<()>,
    {
        let _guard = self.locks.acquire(id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        let mut item = db::items::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| item_not_found(id))?;

        if let Err(e) = apply(&mut item) {
            debug!("{} on item {} rejected: {}", operation, id, e);
            return Err(e);
        }

        item.updated_at = Utc::now();
        db::items::update(&mut tx, &item).await?;
        tx.commit().await?;

        Ok(item)
    }

    // ========================================
    // Catalog exchange
    // ========================================

    /// Current catalog as flat rows, in listing order
    pub async fn export_catalog(&self) -> Result<Vec<CatalogRow>> {
        let items = self.list_items().await?;
        if items.is_empty() {
            return Err(Error::Validation("Catalog is empty".to_string()));
        }
        Ok(items.iter().map(CatalogRow::from_item).collect())
    }

    /// Replace the whole catalog with items built from imported rows
    ///
    /// All or nothing: an invalid row leaves the current catalog in place.
    pub async fn import_catalog(&self, rows: &[CatalogRow]) -> Result<usize> {
        let items = consensus::items_from_rows(rows, &self.config)?;

        let mut tx = db::begin_write(&self.pool).await?;
        let replaced = db::items::delete_all(&mut tx).await?;
        for item in &items {
            db::items::insert(&mut tx, item).await?;
        }
        tx.commit().await?;

        info!(
            "Imported catalog: {} items from {} rows (replaced {})",
            items.len(),
            rows.len(),
            replaced
        );
        Ok(items.len())
    }

    /// Remove every raw record and every catalog item
    pub async fn clear_all(&self) -> Result<ClearedCounts> {
        let mut tx = db::begin_write(&self.pool).await?;
        let raw_records = db::raw_records::delete_all(&mut tx).await?;
        let items = db::items::delete_all(&mut tx).await?;
        tx.commit().await?;

        warn!("Cleared all data: {} items, {} raw records", items, raw_records);
        Ok(ClearedCounts { items, raw_records })
    }

    pub async fn ping(&self) -> Result<()> {
        db::ping(&self.pool).await
    }

    // ========================================
    // Raw records
    // ========================================

    pub async fn list_raw_records(&self) -> Result<Vec<RawRecord>> {
        db::raw_records::list(&self.pool).await
    }

    /// Store one ingested line item
    pub async fn add_raw_record(&self, fields: RawRecordFields) -> Result<RawRecord> {
        let record = RawRecord::new(fields)?;

        let mut conn = self.pool.acquire().await?;
        db::raw_records::insert(&mut conn, &record).await?;

        info!("Added raw record {} '{}' from '{}'", record.id, record.name, record.source_file);
        Ok(record)
    }

    pub async fn edit_raw_record(&self, id: Uuid, fields: RawRecordFields) -> Result<RawRecord> {
        let _guard = self.locks.acquire(id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        let mut record = db::raw_records::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Raw record {}", id)))?;
        record.apply_edit(&fields)?;
        db::raw_records::update(&mut tx, &record).await?;
        tx.commit().await?;

        info!("Raw record {} updated: {}", id, record.name);
        Ok(record)
    }
}

/// Rows removed by [`BrainStore::clear_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedCounts {
    pub items: u64,
    pub raw_records: u64,
}

fn item_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Item {}", id))
}
