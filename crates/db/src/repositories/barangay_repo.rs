//! Repository for the `barangays` table.

use psgc_core::types::DbId;
use sqlx::PgPool;

use crate::models::barangay::{Barangay, UpsertBarangay};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, citymun_id, created_at, updated_at";

/// Provides data access for barangays.
pub struct BarangayRepo;

impl BarangayRepo {
    /// Insert or replace a batch of barangays by id in a single statement.
    pub async fn upsert_batch(pool: &PgPool, rows: &[UpsertBarangay]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let citymun_ids: Vec<DbId> = rows.iter().map(|r| r.citymun_id).collect();

        let result = sqlx::query(
            "INSERT INTO barangays (id, name, citymun_id) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::BIGINT[]) \
             ON CONFLICT (id) DO UPDATE \
             SET name = EXCLUDED.name, citymun_id = EXCLUDED.citymun_id, updated_at = NOW()",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&citymun_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a single barangay by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Barangay>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM barangays WHERE id = $1");
        sqlx::query_as::<_, Barangay>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count all barangays.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM barangays")
            .fetch_one(pool)
            .await
    }
}
