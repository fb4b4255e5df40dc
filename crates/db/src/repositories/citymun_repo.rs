//! Repository for the `citymuns` table.

use psgc_core::types::DbId;
use sqlx::PgPool;

use crate::models::citymun::{CityMun, UpsertCityMun};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, province_id, created_at, updated_at";

/// Provides data access for cities and municipalities.
pub struct CityMunRepo;

impl CityMunRepo {
    /// Insert or replace a batch of cities/municipalities by id in a single statement.
    pub async fn upsert_batch(pool: &PgPool, rows: &[UpsertCityMun]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let province_ids: Vec<DbId> = rows.iter().map(|r| r.province_id).collect();

        let result = sqlx::query(
            "INSERT INTO citymuns (id, name, province_id) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::BIGINT[]) \
             ON CONFLICT (id) DO UPDATE \
             SET name = EXCLUDED.name, province_id = EXCLUDED.province_id, updated_at = NOW()",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&province_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Return which of `ids` already exist.
    pub async fn existing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_scalar::<_, DbId>("SELECT id FROM citymuns WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Find a single city/municipality by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CityMun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM citymuns WHERE id = $1");
        sqlx::query_as::<_, CityMun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count all cities/municipalities.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM citymuns")
            .fetch_one(pool)
            .await
    }
}
