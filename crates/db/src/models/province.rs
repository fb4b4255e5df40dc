//! Province models. Maps to the `provinces` table.

use psgc_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `provinces` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Province {
    pub id: DbId,
    pub name: String,
    pub region_code: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a province by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertProvince {
    pub id: DbId,
    pub name: String,
    pub region_code: String,
}
