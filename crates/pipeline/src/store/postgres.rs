use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use psgc_core::entity::{EntityType, ParentKey};
use psgc_core::types::DbId;
use psgc_db::repositories::{BarangayRepo, CityMunRepo, ProvinceRepo, RegionRepo};
use psgc_db::DbPool;

use super::ReferenceStore;
use crate::error::StoreError;
use crate::record::{RecordBatch, ReferenceRecord};

/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// [`ReferenceStore`] backed by the `psgc-db` repositories.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: DbPool,
}

impl PgReferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Surface constraint violations as their own variant so the job message
/// says what went wrong instead of a generic database error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        if matches!(code.as_deref(), Some(FOREIGN_KEY_VIOLATION) | Some(UNIQUE_VIOLATION)) {
            return StoreError::Constraint(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn count(&self, entity: EntityType) -> Result<u64, StoreError> {
        let count = match entity {
            EntityType::Region => RegionRepo::count(&self.pool).await?,
            EntityType::Province => ProvinceRepo::count(&self.pool).await?,
            EntityType::CityMun => CityMunRepo::count(&self.pool).await?,
            EntityType::Barangay => BarangayRepo::count(&self.pool).await?,
        };
        Ok(count.max(0) as u64)
    }

    async fn existing_parents(&self, keys: &[ParentKey]) -> Result<HashSet<ParentKey>, StoreError> {
        let mut region_codes: Vec<String> = Vec::new();
        let mut province_ids: Vec<DbId> = Vec::new();
        let mut citymun_ids: Vec<DbId> = Vec::new();

        for key in keys {
            match key {
                ParentKey::RegionCode(code) => region_codes.push(code.clone()),
                ParentKey::ProvinceId(id) => province_ids.push(*id),
                ParentKey::CityMunId(id) => citymun_ids.push(*id),
            }
        }

        let mut found = HashSet::new();
        found.extend(
            RegionRepo::existing_codes(&self.pool, &region_codes)
                .await?
                .into_iter()
                .map(ParentKey::RegionCode),
        );
        found.extend(
            ProvinceRepo::existing_ids(&self.pool, &province_ids)
                .await?
                .into_iter()
                .map(ParentKey::ProvinceId),
        );
        found.extend(
            CityMunRepo::existing_ids(&self.pool, &citymun_ids)
                .await?
                .into_iter()
                .map(ParentKey::CityMunId),
        );
        Ok(found)
    }

    async fn region_code_owners(&self, codes: &[String]) -> Result<HashMap<String, DbId>, StoreError> {
        Ok(RegionRepo::code_owners(&self.pool, codes).await?.into_iter().collect())
    }

    async fn upsert_batch(&self, records: &[ReferenceRecord]) -> Result<u64, StoreError> {
        let Some(batch) = RecordBatch::from_records(records)? else {
            return Ok(0);
        };

        let written = match &batch {
            RecordBatch::Regions(rows) => RegionRepo::upsert_batch(&self.pool, rows).await,
            RecordBatch::Provinces(rows) => ProvinceRepo::upsert_batch(&self.pool, rows).await,
            RecordBatch::CityMuns(rows) => CityMunRepo::upsert_batch(&self.pool, rows).await,
            RecordBatch::Barangays(rows) => BarangayRepo::upsert_batch(&self.pool, rows).await,
        }
        .map_err(classify)?;

        tracing::debug!(rows = batch.len(), written, "Reference batch upserted");
        Ok(written)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        psgc_db::health_check(&self.pool).await?;
        Ok(())
    }
}
