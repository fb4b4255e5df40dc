//! The four levels of the geographic hierarchy and their fixed CSV schemas.
//!
//! Each level is uploaded as its own file. Every level below `Region` points
//! at a row of the level above it, so files must be loaded top-down.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Column schemas (order-significant)
// ---------------------------------------------------------------------------

pub const REGION_COLUMNS: &[&str] = &["id", "region_name", "region_code"];
pub const PROVINCE_COLUMNS: &[&str] = &["id", "province_name", "region_code"];
pub const CITYMUN_COLUMNS: &[&str] = &["id", "citymun_name", "province_id"];
pub const BARANGAY_COLUMNS: &[&str] = &["id", "barangay_name", "citymun_id"];

/// Position of the primary id in every schema.
pub const ID_COLUMN: usize = 0;
/// Position of the display name in every schema.
pub const NAME_COLUMN: usize = 1;
/// Position of the third column: the region's own code, or the parent key.
pub const KEY_COLUMN: usize = 2;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// A level of the region → province → city/municipality → barangay hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Region,
    Province,
    #[serde(rename = "citymun")]
    CityMun,
    Barangay,
}

impl EntityType {
    /// All levels in load order (parents first).
    pub const ALL: [EntityType; 4] = [
        EntityType::Region,
        EntityType::Province,
        EntityType::CityMun,
        EntityType::Barangay,
    ];

    /// Singular name used in job snapshots and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Province => "province",
            Self::CityMun => "citymun",
            Self::Barangay => "barangay",
        }
    }

    /// The `upload_type` form value the UI sends for this level.
    pub fn upload_type(&self) -> &'static str {
        match self {
            Self::Region => "regions",
            Self::Province => "provinces",
            Self::CityMun => "citymun",
            Self::Barangay => "barangays",
        }
    }

    /// Parse an `upload_type` form value. Returns `None` for unknown values.
    pub fn from_upload_type(s: &str) -> Option<Self> {
        match s.trim() {
            "regions" => Some(Self::Region),
            "provinces" => Some(Self::Province),
            "citymun" => Some(Self::CityMun),
            "barangays" => Some(Self::Barangay),
            _ => None,
        }
    }

    /// Plural human label, used in messages ("regions", "cities/municipalities").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Region => "regions",
            Self::Province => "provinces",
            Self::CityMun => "cities/municipalities",
            Self::Barangay => "barangays",
        }
    }

    /// The fixed CSV column schema for this level.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Region => REGION_COLUMNS,
            Self::Province => PROVINCE_COLUMNS,
            Self::CityMun => CITYMUN_COLUMNS,
            Self::Barangay => BARANGAY_COLUMNS,
        }
    }

    /// The level this one depends on, if any.
    pub fn parent(&self) -> Option<EntityType> {
        match self {
            Self::Region => None,
            Self::Province => Some(Self::Region),
            Self::CityMun => Some(Self::Province),
            Self::Barangay => Some(Self::CityMun),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parent references
// ---------------------------------------------------------------------------

/// A reference from a child row to the parent row it must resolve against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParentKey {
    /// `provinces.region_code` → `regions.code`.
    RegionCode(String),
    /// `citymuns.province_id` → `provinces.id`.
    ProvinceId(i64),
    /// `barangays.citymun_id` → `citymuns.id`.
    CityMunId(i64),
}

impl ParentKey {
    /// The level the referenced row lives in.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::RegionCode(_) => EntityType::Region,
            Self::ProvinceId(_) => EntityType::Province,
            Self::CityMunId(_) => EntityType::CityMun,
        }
    }
}

impl std::fmt::Display for ParentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegionCode(code) => write!(f, "region code '{code}'"),
            Self::ProvinceId(id) => write!(f, "province id {id}"),
            Self::CityMunId(id) => write!(f, "city/municipality id {id}"),
        }
    }
}
