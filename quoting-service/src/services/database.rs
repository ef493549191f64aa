//! PostgreSQL document store for quoting-service.

use crate::domain::{DocumentError, SequenceSource};
use crate::models::{Document, DocumentKind, DocumentNumber, Line};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{DocumentStore, StoreError, WriteBatch, WriteOp};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, kind, number, number_final, status, client_reference, \
    project_reference, valid_until, notes, subtotal, tax_amount, total, source_document_id, \
    issued_at, created_by, updated_by, created_at, updated_at, version";

const LINE_COLUMNS: &str = "id, document_id, concept, description, quantity, unit_price, \
    discount_percent, tax_rate, subtotal, tax_amount, total, line_order, created_at";

/// Row shape of the `documents` table.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    kind: String,
    number: String,
    number_final: bool,
    status: String,
    client_reference: Option<String>,
    project_reference: Option<String>,
    valid_until: Option<NaiveDate>,
    notes: Option<String>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    source_document_id: Option<Uuid>,
    issued_at: Option<DateTime<Utc>>,
    created_by: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl DocumentRow {
    fn into_document(self, lines: Vec<Line>) -> Result<Document, StoreError> {
        Ok(Document {
            id: self.id,
            kind: self.kind.parse()?,
            number: if self.number_final {
                DocumentNumber::Final(self.number)
            } else {
                DocumentNumber::Provisional(self.number)
            },
            status: self.status.parse()?,
            client_reference: self.client_reference,
            project_reference: self.project_reference,
            valid_until: self.valid_until,
            notes: self.notes,
            lines,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
            source_document_id: self.source_document_id,
            issued_at: self.issued_at,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| StoreError::Backend(anyhow::anyhow!("{}: {}", context, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "quoting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn insert_document(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        );

        sqlx::query(&sql)
            .bind(document.id)
            .bind(document.kind.as_str())
            .bind(document.number.as_str())
            .bind(document.number.is_final())
            .bind(document.status.as_str())
            .bind(&document.client_reference)
            .bind(&document.project_reference)
            .bind(document.valid_until)
            .bind(&document.notes)
            .bind(document.subtotal)
            .bind(document.tax_amount)
            .bind(document.total)
            .bind(document.source_document_id)
            .bind(document.issued_at)
            .bind(&document.created_by)
            .bind(&document.updated_by)
            .bind(document.created_at)
            .bind(document.updated_at)
            .bind(document.version)
            .execute(&mut **tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StoreError::WriteConflict(document.id)
                }
                _ => StoreError::Backend(anyhow::anyhow!("Failed to insert document: {}", e)),
            })?;

        for line in &document.lines {
            Self::upsert_line(tx, line).await?;
        }

        Ok(())
    }

    async fn update_document(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET number = $3,
                number_final = $4,
                status = $5,
                client_reference = $6,
                project_reference = $7,
                valid_until = $8,
                notes = $9,
                subtotal = $10,
                tax_amount = $11,
                total = $12,
                issued_at = $13,
                updated_by = $14,
                updated_at = $15,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(document.id)
        .bind(document.version)
        .bind(document.number.as_str())
        .bind(document.number.is_final())
        .bind(document.status.as_str())
        .bind(&document.client_reference)
        .bind(&document.project_reference)
        .bind(document.valid_until)
        .bind(&document.notes)
        .bind(document.subtotal)
        .bind(document.tax_amount)
        .bind(document.total)
        .bind(document.issued_at)
        .bind(&document.updated_by)
        .bind(document.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::WriteConflict(document.id)
            }
            _ => StoreError::Backend(anyhow::anyhow!("Failed to update document: {}", e)),
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1)")
            .bind(document.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(db_error("Failed to check document"))?;

        if exists {
            Err(StoreError::WriteConflict(document.id))
        } else {
            Err(StoreError::NotFound(format!("Document {}", document.id)))
        }
    }

    async fn upsert_line(tx: &mut Transaction<'_, Postgres>, line: &Line) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            INSERT INTO document_lines ({LINE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE
            SET concept = EXCLUDED.concept,
                description = EXCLUDED.description,
                quantity = EXCLUDED.quantity,
                unit_price = EXCLUDED.unit_price,
                discount_percent = EXCLUDED.discount_percent,
                tax_rate = EXCLUDED.tax_rate,
                subtotal = EXCLUDED.subtotal,
                tax_amount = EXCLUDED.tax_amount,
                total = EXCLUDED.total,
                line_order = EXCLUDED.line_order
            WHERE document_lines.document_id = EXCLUDED.document_id
            "#
        );

        let result = sqlx::query(&sql)
            .bind(line.id)
            .bind(line.document_id)
            .bind(&line.concept)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.discount_percent)
            .bind(line.tax_rate)
            .bind(line.subtotal)
            .bind(line.tax_amount)
            .bind(line.total)
            .bind(line.line_order)
            .bind(line.created_at)
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to save line"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Line {}", line.id)));
        }
        Ok(())
    }

    async fn delete_line(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        line_id: Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM document_lines WHERE id = $1 AND document_id = $2")
            .bind(line_id)
            .bind(document_id)
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to delete line"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Line {}", line_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl SequenceSource for Database {
    #[instrument(skip(self))]
    async fn next_sequence_value(&self, kind: DocumentKind) -> Result<i64, DocumentError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["next_sequence_value"])
            .start_timer();

        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (kind, last_value)
            VALUES ($1, 1)
            ON CONFLICT (kind) DO UPDATE
            SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DocumentError::Storage(anyhow::anyhow!("Failed to reserve number: {}", e)))?;

        timer.observe_duration();

        Ok(value)
    }
}

#[async_trait]
impl DocumentStore for Database {
    #[instrument(skip(self))]
    async fn load_document(&self, id: Uuid) -> Result<Document, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_document"])
            .start_timer();

        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load document"))?
            .ok_or_else(|| StoreError::NotFound(format!("Document {}", id)))?;

        let lines = self.load_lines(id).await?;

        timer.observe_duration();

        row.into_document(lines)
    }

    #[instrument(skip(self))]
    async fn load_lines(&self, document_id: Uuid) -> Result<Vec<Line>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_lines"])
            .start_timer();

        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM document_lines WHERE document_id = $1 ORDER BY line_order"
        );
        let lines = sqlx::query_as::<_, Line>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load lines"))?;

        if lines.is_empty() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1)")
                    .bind(document_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error("Failed to check document"))?;
            if !exists {
                return Err(StoreError::NotFound(format!("Document {}", document_id)));
            }
        }

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn load_line(&self, line_id: Uuid) -> Result<Line, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_line"])
            .start_timer();

        let sql = format!("SELECT {LINE_COLUMNS} FROM document_lines WHERE id = $1");
        let line = sqlx::query_as::<_, Line>(&sql)
            .bind(line_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load line"))?
            .ok_or_else(|| StoreError::NotFound(format!("Line {}", line_id)))?;

        timer.observe_duration();

        Ok(line)
    }

    #[instrument(skip(self, batch), fields(ops = batch.ops().len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["commit"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        for op in batch.ops() {
            match op {
                WriteOp::InsertDocument(document) => Self::insert_document(&mut tx, document).await?,
                WriteOp::UpdateDocument(document) => Self::update_document(&mut tx, document).await?,
                WriteOp::SaveLine(line) => Self::upsert_line(&mut tx, line).await?,
                WriteOp::DeleteLine {
                    document_id,
                    line_id,
                } => Self::delete_line(&mut tx, *document_id, *line_id).await?,
            }
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }
}
