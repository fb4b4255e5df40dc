//! The destination relational store for reference rows.
//!
//! The pipeline needs little from it: count a level, check which parent
//! keys and region codes exist, and upsert a batch atomically.

mod memory;
mod postgres;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use psgc_core::entity::{EntityType, ParentKey};
use psgc_core::types::DbId;

use crate::error::StoreError;
use crate::record::ReferenceRecord;

pub use memory::MemoryReferenceStore;
pub use postgres::PgReferenceStore;

/// Upsert and existence lookup over the four reference tables.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Number of rows currently stored for `entity`.
    async fn count(&self, entity: EntityType) -> Result<u64, StoreError>;

    /// The subset of `keys` that resolve to an existing parent row.
    async fn existing_parents(&self, keys: &[ParentKey]) -> Result<HashSet<ParentKey>, StoreError>;

    /// Id of the stored region holding each of `codes`, for those that exist.
    async fn region_code_owners(&self, codes: &[String]) -> Result<HashMap<String, DbId>, StoreError>;

    /// Insert or replace `records` by primary id as one atomic unit.
    ///
    /// All records must belong to the same level. Returns the number of rows
    /// written.
    async fn upsert_batch(&self, records: &[ReferenceRecord]) -> Result<u64, StoreError>;

    /// Confirm the store is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}
