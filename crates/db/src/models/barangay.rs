//! Barangay models. Maps to the `barangays` table.

use psgc_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `barangays` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Barangay {
    pub id: DbId,
    pub name: String,
    pub citymun_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a barangay by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertBarangay {
    pub id: DbId,
    pub name: String,
    pub citymun_id: DbId,
}
