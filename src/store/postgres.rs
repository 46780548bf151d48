//! # Postgres Batch Store
//!
//! sqlx-backed [`BatchStore`] implementation. Uses the runtime query API
//! rather than the compile-time checked macros so the crate builds without
//! a live database; write-once status semantics are enforced with guarded
//! `UPDATE ... WHERE status = <non-terminal>` statements.

use crate::error::{Result, SweeperError};
use crate::models::{Batch, BatchPart, BatchStatus, NewBatch, NewBatchPart, PartStatus, PartType};
use crate::store::BatchStore;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sweeper_batches (
    id UUID PRIMARY KEY,
    batch_type TEXT NOT NULL,
    status TEXT NOT NULL,
    search_key TEXT,
    search_key2 TEXT,
    tenant_id TEXT,
    document_json JSONB NOT NULL,
    create_time TIMESTAMP NOT NULL,
    complete_time TIMESTAMP
);

CREATE TABLE IF NOT EXISTS sweeper_batch_parts (
    id UUID PRIMARY KEY,
    batch_id UUID NOT NULL REFERENCES sweeper_batches(id),
    part_type TEXT NOT NULL,
    search_key TEXT,
    search_key2 TEXT,
    status TEXT NOT NULL,
    result_document_json JSONB,
    create_time TIMESTAMP NOT NULL,
    complete_time TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_sweeper_parts_batch_type_status
    ON sweeper_batch_parts (batch_id, part_type, status);
"#;

#[derive(FromRow)]
struct BatchRow {
    id: Uuid,
    batch_type: String,
    status: String,
    search_key: Option<String>,
    search_key2: Option<String>,
    tenant_id: Option<String>,
    document_json: Value,
    create_time: NaiveDateTime,
    complete_time: Option<NaiveDateTime>,
}

impl BatchRow {
    fn into_batch(self) -> Result<Batch> {
        let status = BatchStatus::parse(&self.status).ok_or_else(|| {
            SweeperError::store("load_batch", format!("unknown batch status '{}'", self.status))
        })?;
        Ok(Batch {
            id: self.id,
            batch_type: self.batch_type,
            status,
            search_key: self.search_key,
            search_key2: self.search_key2,
            tenant_id: self.tenant_id,
            document_json: self.document_json,
            create_time: self.create_time,
            complete_time: self.complete_time,
        })
    }
}

#[derive(FromRow)]
struct BatchPartRow {
    id: Uuid,
    batch_id: Uuid,
    part_type: String,
    search_key: Option<String>,
    search_key2: Option<String>,
    status: String,
    result_document_json: Option<Value>,
    create_time: NaiveDateTime,
    complete_time: Option<NaiveDateTime>,
}

impl BatchPartRow {
    fn into_part(self) -> Result<BatchPart> {
        let part_type = PartType::parse(&self.part_type).ok_or_else(|| {
            SweeperError::store("load_part", format!("unknown part type '{}'", self.part_type))
        })?;
        let status = PartStatus::parse(&self.status).ok_or_else(|| {
            SweeperError::store("load_part", format!("unknown part status '{}'", self.status))
        })?;
        Ok(BatchPart {
            id: self.id,
            batch_id: self.batch_id,
            part_type,
            search_key: self.search_key,
            search_key2: self.search_key2,
            status,
            result_document_json: self.result_document_json,
            create_time: self.create_time,
            complete_time: self.complete_time,
        })
    }
}

/// Durable batch repository backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresBatchStore {
    pool: PgPool,
}

impl PostgresBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the batch tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| SweeperError::store("ensure_schema", e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BatchStore for PostgresBatchStore {
    async fn create_batch(&self, new_batch: NewBatch) -> Result<Batch> {
        let batch = Batch {
            id: Uuid::new_v4(),
            batch_type: new_batch.batch_type,
            status: BatchStatus::InProgress,
            search_key: new_batch.search_key,
            search_key2: new_batch.search_key2,
            tenant_id: new_batch.tenant_id,
            document_json: new_batch.document_json,
            create_time: Utc::now().naive_utc(),
            complete_time: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sweeper_batches
                (id, batch_type, status, search_key, search_key2, tenant_id, document_json, create_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(batch.id)
        .bind(&batch.batch_type)
        .bind(batch.status.as_str())
        .bind(&batch.search_key)
        .bind(&batch.search_key2)
        .bind(&batch.tenant_id)
        .bind(&batch.document_json)
        .bind(batch.create_time)
        .execute(&self.pool)
        .await
        .map_err(|e| SweeperError::store("create_batch", e.to_string()))?;

        Ok(batch)
    }

    async fn find_batch(&self, batch_id: Uuid) -> Result<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT * FROM sweeper_batches WHERE id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SweeperError::store("find_batch", e.to_string()))?;

        row.map(BatchRow::into_batch).transpose()
    }

    async fn complete_batch(&self, batch_id: Uuid, status: BatchStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sweeper_batches
            SET status = $2, complete_time = $3
            WHERE id = $1 AND status = 'IN_PROGRESS'
            "#,
        )
        .bind(batch_id)
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| SweeperError::store("complete_batch", e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SweeperError::invariant(format!(
                "batch {batch_id} is unknown or already terminal"
            )));
        }
        Ok(())
    }

    async fn create_part(&self, new_part: NewBatchPart) -> Result<BatchPart> {
        let part = BatchPart {
            id: Uuid::new_v4(),
            batch_id: new_part.batch_id,
            part_type: new_part.part_type,
            search_key: new_part.search_key,
            search_key2: new_part.search_key2,
            status: PartStatus::Waiting,
            result_document_json: None,
            create_time: Utc::now().naive_utc(),
            complete_time: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sweeper_batch_parts
                (id, batch_id, part_type, search_key, search_key2, status, create_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(part.id)
        .bind(part.batch_id)
        .bind(part.part_type.as_str())
        .bind(&part.search_key)
        .bind(&part.search_key2)
        .bind(part.status.as_str())
        .bind(part.create_time)
        .execute(&self.pool)
        .await
        .map_err(|e| SweeperError::store("create_part", e.to_string()))?;

        Ok(part)
    }

    async fn find_part(&self, part_id: Uuid) -> Result<Option<BatchPart>> {
        let row = sqlx::query_as::<_, BatchPartRow>(
            "SELECT * FROM sweeper_batch_parts WHERE id = $1",
        )
        .bind(part_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SweeperError::store("find_part", e.to_string()))?;

        row.map(BatchPartRow::into_part).transpose()
    }

    async fn complete_part(
        &self,
        part_id: Uuid,
        status: PartStatus,
        result_document: Value,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sweeper_batch_parts
            SET status = $2, result_document_json = $3, complete_time = $4
            WHERE id = $1 AND status = 'WAITING'
            "#,
        )
        .bind(part_id)
        .bind(status.as_str())
        .bind(result_document)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| SweeperError::store("complete_part", e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SweeperError::invariant(format!(
                "part {part_id} is unknown or already terminal"
            )));
        }
        Ok(())
    }

    async fn parts_by_batch_and_type(
        &self,
        batch_id: Uuid,
        part_type: PartType,
    ) -> Result<Vec<BatchPart>> {
        let rows = sqlx::query_as::<_, BatchPartRow>(
            r#"
            SELECT * FROM sweeper_batch_parts
            WHERE batch_id = $1 AND part_type = $2
            ORDER BY create_time, id
            "#,
        )
        .bind(batch_id)
        .bind(part_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SweeperError::store("parts_by_batch_and_type", e.to_string()))?;

        rows.into_iter().map(BatchPartRow::into_part).collect()
    }

    async fn parts_by_batch_type_and_status(
        &self,
        batch_id: Uuid,
        part_type: PartType,
        status: PartStatus,
    ) -> Result<Vec<BatchPart>> {
        let rows = sqlx::query_as::<_, BatchPartRow>(
            r#"
            SELECT * FROM sweeper_batch_parts
            WHERE batch_id = $1 AND part_type = $2 AND status = $3
            ORDER BY create_time, id
            "#,
        )
        .bind(batch_id)
        .bind(part_type.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SweeperError::store("parts_by_batch_type_and_status", e.to_string()))?;

        rows.into_iter().map(BatchPartRow::into_part).collect()
    }
}
