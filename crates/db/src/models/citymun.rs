//! City/municipality models. Maps to the `citymuns` table.

use psgc_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `citymuns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CityMun {
    pub id: DbId,
    pub name: String,
    pub province_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a city/municipality by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCityMun {
    pub id: DbId,
    pub name: String,
    pub province_id: DbId,
}
