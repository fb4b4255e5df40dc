//! Repository for the `provinces` table.

use psgc_core::types::DbId;
use sqlx::PgPool;

use crate::models::province::{Province, UpsertProvince};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, region_code, created_at, updated_at";

/// Provides data access for provinces.
pub struct ProvinceRepo;

impl ProvinceRepo {
    /// Insert or replace a batch of provinces by id in a single statement.
    ///
    /// A `region_code` with no matching region fails the whole batch with a
    /// foreign-key violation.
    pub async fn upsert_batch(pool: &PgPool, rows: &[UpsertProvince]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let region_codes: Vec<&str> = rows.iter().map(|r| r.region_code.as_str()).collect();

        let result = sqlx::query(
            "INSERT INTO provinces (id, name, region_code) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[]) \
             ON CONFLICT (id) DO UPDATE \
             SET name = EXCLUDED.name, region_code = EXCLUDED.region_code, updated_at = NOW()",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&region_codes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Return which of `ids` already exist.
    pub async fn existing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_scalar::<_, DbId>("SELECT id FROM provinces WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Find a single province by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Province>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provinces WHERE id = $1");
        sqlx::query_as::<_, Province>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the provinces of one region.
    pub async fn list_by_region(pool: &PgPool, region_code: &str) -> Result<Vec<Province>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provinces WHERE region_code = $1 ORDER BY id");
        sqlx::query_as::<_, Province>(&query)
            .bind(region_code)
            .fetch_all(pool)
            .await
    }

    /// Count all provinces.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM provinces")
            .fetch_one(pool)
            .await
    }
}
