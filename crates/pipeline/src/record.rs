//! Validated rows on their way to the reference store.

use psgc_core::entity::{EntityType, ParentKey};
use psgc_core::types::DbId;
use psgc_db::models::barangay::UpsertBarangay;
use psgc_db::models::citymun::UpsertCityMun;
use psgc_db::models::province::UpsertProvince;
use psgc_db::models::region::UpsertRegion;

use crate::error::StoreError;

/// One structurally valid row of any level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceRecord {
    Region(UpsertRegion),
    Province(UpsertProvince),
    CityMun(UpsertCityMun),
    Barangay(UpsertBarangay),
}

impl ReferenceRecord {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Region(_) => EntityType::Region,
            Self::Province(_) => EntityType::Province,
            Self::CityMun(_) => EntityType::CityMun,
            Self::Barangay(_) => EntityType::Barangay,
        }
    }

    pub fn id(&self) -> DbId {
        match self {
            Self::Region(r) => r.id,
            Self::Province(r) => r.id,
            Self::CityMun(r) => r.id,
            Self::Barangay(r) => r.id,
        }
    }

    /// The parent row this record must resolve against, if any.
    pub fn parent_key(&self) -> Option<ParentKey> {
        match self {
            Self::Region(_) => None,
            Self::Province(r) => Some(ParentKey::RegionCode(r.region_code.clone())),
            Self::CityMun(r) => Some(ParentKey::ProvinceId(r.province_id)),
            Self::Barangay(r) => Some(ParentKey::CityMunId(r.citymun_id)),
        }
    }
}

/// A homogeneous batch, typed by level, ready for a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBatch {
    Regions(Vec<UpsertRegion>),
    Provinces(Vec<UpsertProvince>),
    CityMuns(Vec<UpsertCityMun>),
    Barangays(Vec<UpsertBarangay>),
}

impl RecordBatch {
    /// Group records into a typed batch.
    ///
    /// Returns `Ok(None)` for an empty slice and [`StoreError::MixedBatch`]
    /// if the records span more than one level.
    pub fn from_records(records: &[ReferenceRecord]) -> Result<Option<Self>, StoreError> {
        let Some(first) = records.first() else {
            return Ok(None);
        };

        macro_rules! collect {
            ($variant:ident, $batch:ident) => {
                records
                    .iter()
                    .map(|r| match r {
                        ReferenceRecord::$variant(row) => Ok(row.clone()),
                        _ => Err(StoreError::MixedBatch),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(RecordBatch::$batch)
            };
        }

        let batch = match first {
            ReferenceRecord::Region(_) => collect!(Region, Regions)?,
            ReferenceRecord::Province(_) => collect!(Province, Provinces)?,
            ReferenceRecord::CityMun(_) => collect!(CityMun, CityMuns)?,
            ReferenceRecord::Barangay(_) => collect!(Barangay, Barangays)?,
        };
        Ok(Some(batch))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Regions(rows) => rows.len(),
            Self::Provinces(rows) => rows.len(),
            Self::CityMuns(rows) => rows.len(),
            Self::Barangays(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
