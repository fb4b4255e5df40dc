use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use psgc_core::entity::{EntityType, ParentKey};
use psgc_core::types::DbId;
use psgc_db::models::barangay::UpsertBarangay;
use psgc_db::models::citymun::UpsertCityMun;
use psgc_db::models::province::UpsertProvince;
use psgc_db::models::region::UpsertRegion;
use tokio::sync::RwLock;

use super::ReferenceStore;
use crate::error::StoreError;
use crate::record::{RecordBatch, ReferenceRecord};

#[derive(Debug, Default)]
struct Tables {
    regions: BTreeMap<DbId, UpsertRegion>,
    provinces: BTreeMap<DbId, UpsertProvince>,
    citymuns: BTreeMap<DbId, UpsertCityMun>,
    barangays: BTreeMap<DbId, UpsertBarangay>,
}

impl Tables {
    fn has_parent(&self, key: &ParentKey) -> bool {
        match key {
            ParentKey::RegionCode(code) => self.regions.values().any(|r| &r.code == code),
            ParentKey::ProvinceId(id) => self.provinces.contains_key(id),
            ParentKey::CityMunId(id) => self.citymuns.contains_key(id),
        }
    }

    /// Check a whole batch against the same constraints the PostgreSQL
    /// schema enforces, before anything is written.
    fn check(&self, batch: &RecordBatch) -> Result<(), StoreError> {
        match batch {
            RecordBatch::Regions(rows) => {
                for row in rows {
                    let taken = self
                        .regions
                        .values()
                        .any(|r| r.code == row.code && r.id != row.id)
                        || rows.iter().any(|r| r.code == row.code && r.id != row.id);
                    if taken {
                        return Err(StoreError::Constraint(format!(
                            "region code '{}' is already used by another region",
                            row.code
                        )));
                    }
                }
            }
            RecordBatch::Provinces(rows) => {
                for row in rows {
                    let key = ParentKey::RegionCode(row.region_code.clone());
                    if !self.has_parent(&key) {
                        return Err(StoreError::Constraint(format!("province {}: unknown {key}", row.id)));
                    }
                }
            }
            RecordBatch::CityMuns(rows) => {
                for row in rows {
                    let key = ParentKey::ProvinceId(row.province_id);
                    if !self.has_parent(&key) {
                        return Err(StoreError::Constraint(format!(
                            "city/municipality {}: unknown {key}",
                            row.id
                        )));
                    }
                }
            }
            RecordBatch::Barangays(rows) => {
                for row in rows {
                    let key = ParentKey::CityMunId(row.citymun_id);
                    if !self.has_parent(&key) {
                        return Err(StoreError::Constraint(format!("barangay {}: unknown {key}", row.id)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// In-process [`ReferenceStore`] with the same upsert and foreign-key
/// semantics as the PostgreSQL schema.
///
/// Backs the server when `DATABASE_URL=memory` and the pipeline tests.
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    tables: RwLock<Tables>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored rows of one level, ordered by id.
    pub async fn records(&self, entity: EntityType) -> Vec<ReferenceRecord> {
        let tables = self.tables.read().await;
        match entity {
            EntityType::Region => tables.regions.values().cloned().map(ReferenceRecord::Region).collect(),
            EntityType::Province => tables
                .provinces
                .values()
                .cloned()
                .map(ReferenceRecord::Province)
                .collect(),
            EntityType::CityMun => tables.citymuns.values().cloned().map(ReferenceRecord::CityMun).collect(),
            EntityType::Barangay => tables
                .barangays
                .values()
                .cloned()
                .map(ReferenceRecord::Barangay)
                .collect(),
        }
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn count(&self, entity: EntityType) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let count = match entity {
            EntityType::Region => tables.regions.len(),
            EntityType::Province => tables.provinces.len(),
            EntityType::CityMun => tables.citymuns.len(),
            EntityType::Barangay => tables.barangays.len(),
        };
        Ok(count as u64)
    }

    async fn existing_parents(&self, keys: &[ParentKey]) -> Result<HashSet<ParentKey>, StoreError> {
        let tables = self.tables.read().await;
        Ok(keys.iter().filter(|k| tables.has_parent(k)).cloned().collect())
    }

    async fn region_code_owners(&self, codes: &[String]) -> Result<HashMap<String, DbId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .regions
            .values()
            .filter(|r| codes.contains(&r.code))
            .map(|r| (r.code.clone(), r.id))
            .collect())
    }

    async fn upsert_batch(&self, records: &[ReferenceRecord]) -> Result<u64, StoreError> {
        let Some(batch) = RecordBatch::from_records(records)? else {
            return Ok(0);
        };

        let mut tables = self.tables.write().await;
        tables.check(&batch)?;

        let written = batch.len() as u64;
        match batch {
            RecordBatch::Regions(rows) => tables.regions.extend(rows.into_iter().map(|r| (r.id, r))),
            RecordBatch::Provinces(rows) => tables.provinces.extend(rows.into_iter().map(|r| (r.id, r))),
            RecordBatch::CityMuns(rows) => tables.citymuns.extend(rows.into_iter().map(|r| (r.id, r))),
            RecordBatch::Barangays(rows) => tables.barangays.extend(rows.into_iter().map(|r| (r.id, r))),
        }
        Ok(written)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn region(id: DbId, code: &str) -> ReferenceRecord {
        ReferenceRecord::Region(UpsertRegion {
            id,
            name: format!("Region {id}"),
            code: code.to_string(),
        })
    }

    fn province(id: DbId, region_code: &str) -> ReferenceRecord {
        ReferenceRecord::Province(UpsertProvince {
            id,
            name: format!("Province {id}"),
            region_code: region_code.to_string(),
        })
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = MemoryReferenceStore::new();
        store.upsert_batch(&[region(1, "R1")]).await.unwrap();
        store
            .upsert_batch(&[ReferenceRecord::Region(UpsertRegion {
                id: 1,
                name: "Renamed".into(),
                code: "R1".into(),
            })])
            .await
            .unwrap();

        assert_eq!(store.count(EntityType::Region).await.unwrap(), 1);
        let rows = store.records(EntityType::Region).await;
        assert_matches!(&rows[0], ReferenceRecord::Region(r) if r.name == "Renamed");
    }

    #[tokio::test]
    async fn child_batch_with_unknown_parent_writes_nothing() {
        let store = MemoryReferenceStore::new();
        store.upsert_batch(&[region(1, "R1")]).await.unwrap();

        let result = store.upsert_batch(&[province(10, "R1"), province(11, "R9")]).await;

        assert_matches!(result, Err(StoreError::Constraint(_)));
        assert_eq!(store.count(EntityType::Province).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_region_code_is_a_constraint_violation() {
        let store = MemoryReferenceStore::new();
        store.upsert_batch(&[region(1, "R1")]).await.unwrap();

        let result = store.upsert_batch(&[region(2, "R1")]).await;
        assert_matches!(result, Err(StoreError::Constraint(msg)) if msg.contains("R1"));
    }

    #[tokio::test]
    async fn existing_parents_returns_only_known_keys() {
        let store = MemoryReferenceStore::new();
        store.upsert_batch(&[region(1, "R1")]).await.unwrap();
        store.upsert_batch(&[province(10, "R1")]).await.unwrap();

        let keys = [
            ParentKey::RegionCode("R1".into()),
            ParentKey::RegionCode("R2".into()),
            ParentKey::ProvinceId(10),
            ParentKey::ProvinceId(11),
        ];
        let found = store.existing_parents(&keys).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains(&ParentKey::RegionCode("R1".into())));
        assert!(found.contains(&ParentKey::ProvinceId(10)));
    }
}
