//! Repository for the `regions` table.

use psgc_core::types::DbId;
use sqlx::PgPool;

use crate::models::region::{Region, UpsertRegion};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, code, created_at, updated_at";

/// Provides data access for regions.
pub struct RegionRepo;

impl RegionRepo {
    /// Insert or replace a batch of regions by id in a single statement.
    ///
    /// The statement is atomic: either every row in the batch is written or
    /// none is. Returns the number of rows written.
    pub async fn upsert_batch(pool: &PgPool, rows: &[UpsertRegion]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();

        let result = sqlx::query(
            "INSERT INTO regions (id, name, code) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[]) \
             ON CONFLICT (id) DO UPDATE \
             SET name = EXCLUDED.name, code = EXCLUDED.code, updated_at = NOW()",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&codes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Return which of `codes` already exist.
    pub async fn existing_codes(pool: &PgPool, codes: &[String]) -> Result<Vec<String>, sqlx::Error> {
        if codes.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_scalar::<_, String>("SELECT code FROM regions WHERE code = ANY($1)")
            .bind(codes)
            .fetch_all(pool)
            .await
    }

    /// Find a single region by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Region>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM regions WHERE id = $1");
        sqlx::query_as::<_, Region>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Return `(code, id)` for each of `codes` that is already stored.
    pub async fn code_owners(pool: &PgPool, codes: &[String]) -> Result<Vec<(String, DbId)>, sqlx::Error> {
        if codes.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_as::<_, (String, DbId)>("SELECT code, id FROM regions WHERE code = ANY($1)")
            .bind(codes)
            .fetch_all(pool)
            .await
    }

    /// Count all regions.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM regions")
            .fetch_one(pool)
            .await
    }
}
