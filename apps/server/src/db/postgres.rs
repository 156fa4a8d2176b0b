//! PostgreSQL backend
//!
//! Record payloads live in a JSONB column; name search uses `ILIKE` over JSON
//! paths and date ranges compare the ISO date text, which orders correctly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, types::Json, PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use super::traits::{AuditTrailStore, NotificationStore, RecordQuery, RecordStore};
use crate::{
    config::DatabaseConfig,
    models::{
        AuditAction, AuditEntry, Lifecycle, LifecycleFilter, Notification, NotificationKind,
        Priority, StoredRecord, UserRef,
    },
    Error, Result,
};

const RECORD_COLUMNS: &str = "id, collection, code, payload, created_by, created_at, \
     updated_by, updated_at, deleted_at, deleted_by";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured pool settings and optionally run migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .connect(&config.url)
            .await?;

        if config.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| Error::Internal(format!("Migration failed: {e}")))?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, Clone)]
enum BindValue {
    Text(String),
    TextArray(Vec<String>),
}

/// `/referralSlip/patientName` -> `{referralSlip,patientName}` for `#>>`.
fn pointer_path(pointer: &str) -> Vec<String> {
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// WHERE clause and bind values for a record query.
fn build_where(query: &RecordQuery) -> (String, Vec<BindValue>) {
    let mut binds = vec![BindValue::Text(query.collection.clone())];
    let mut clauses = vec!["collection = $1".to_string()];

    clauses.push(
        match query.lifecycle {
            LifecycleFilter::Active => "deleted_at IS NULL",
            LifecycleFilter::Deleted => "deleted_at IS NOT NULL",
        }
        .to_string(),
    );

    if let Some(owner) = &query.owner {
        binds.push(BindValue::Text(owner.clone()));
        clauses.push(format!("created_by->>'id' = ${}", binds.len()));
    }

    if let Some(codes) = &query.codes {
        binds.push(BindValue::TextArray(codes.clone()));
        clauses.push(format!("code = ANY(${})", binds.len()));
    }

    if let Some(text) = &query.text {
        binds.push(BindValue::Text(escape_like(&text.needle)));
        let needle_idx = binds.len();
        let mut alternatives = Vec::new();
        for field in &text.fields {
            binds.push(BindValue::TextArray(pointer_path(field)));
            alternatives.push(format!(
                "payload #>> ${}::text[] ILIKE ${}",
                binds.len(),
                needle_idx
            ));
        }
        if !alternatives.is_empty() {
            clauses.push(format!("({})", alternatives.join(" OR ")));
        }
    }

    if let Some(range) = &query.date_range {
        binds.push(BindValue::TextArray(pointer_path(&range.field)));
        let path_idx = binds.len();
        binds.push(BindValue::Text(range.start.format("%Y-%m-%d").to_string()));
        binds.push(BindValue::Text(range.end.format("%Y-%m-%d").to_string()));
        clauses.push(format!(
            "LEFT(payload #>> ${path_idx}::text[], 10) BETWEEN ${} AND ${}",
            path_idx + 1,
            path_idx + 2
        ));
    }

    (clauses.join(" AND "), binds)
}

fn record_from_row(row: &PgRow) -> Result<StoredRecord> {
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;
    let deleted_by: Option<Json<UserRef>> = row.try_get("deleted_by")?;
    let lifecycle = match (deleted_at, deleted_by) {
        (Some(deleted_at), Some(Json(deleted_by))) => Lifecycle::Deleted {
            deleted_at,
            deleted_by,
        },
        (None, _) => Lifecycle::Active,
        (Some(_), None) => {
            return Err(Error::Internal(
                "Deleted record is missing deleted_by".to_string(),
            ))
        }
    };

    let Json(created_by): Json<UserRef> = row.try_get("created_by")?;
    let updated_by: Option<Json<UserRef>> = row.try_get("updated_by")?;

    Ok(StoredRecord {
        id: row.try_get("id")?,
        collection: row.try_get("collection")?,
        code: row.try_get("code")?,
        payload: row.try_get::<JsonValue, _>("payload")?,
        created_by,
        created_at: row.try_get("created_at")?,
        updated_by: updated_by.map(|Json(u)| u),
        updated_at: row.try_get("updated_at")?,
        lifecycle,
    })
}

fn deletion_columns(lifecycle: &Lifecycle) -> (Option<DateTime<Utc>>, Option<Json<&UserRef>>) {
    match lifecycle {
        Lifecycle::Active => (None, None),
        Lifecycle::Deleted {
            deleted_at,
            deleted_by,
        } => (Some(*deleted_at), Some(Json(deleted_by))),
    }
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("{what} already exists"))
        }
        _ => Error::Database(err),
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn insert(&self, record: &StoredRecord) -> Result<()> {
        let (deleted_at, deleted_by) = deletion_columns(&record.lifecycle);
        sqlx::query(
            r#"
            INSERT INTO records
                (id, collection, code, payload, created_by, created_at,
                 updated_by, updated_at, deleted_at, deleted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.collection)
        .bind(&record.code)
        .bind(&record.payload)
        .bind(Json(&record.created_by))
        .bind(record.created_at)
        .bind(record.updated_by.as_ref().map(Json))
        .bind(record.updated_at)
        .bind(deleted_at)
        .bind(deleted_by)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Record {}", record.code)))?;

        Ok(())
    }

    async fn find_by_code(
        &self,
        collection: &str,
        code: &str,
        lifecycle: LifecycleFilter,
    ) -> Result<Option<StoredRecord>> {
        let query = RecordQuery {
            lifecycle,
            codes: Some(vec![code.to_string()]),
            ..RecordQuery::active(collection)
        };
        Ok(self.find(&query).await?.into_iter().next())
    }

    async fn find(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>> {
        let (clause, binds) = build_where(query);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE {clause} ORDER BY created_at DESC, id DESC"
        );

        let mut q = sqlx::query(&sql);
        for value in binds {
            q = match value {
                BindValue::Text(v) => q.bind(v),
                BindValue::TextArray(vs) => q.bind(vs),
            };
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self, query: &RecordQuery) -> Result<i64> {
        let (clause, binds) = build_where(query);
        let sql = format!("SELECT COUNT(*) FROM records WHERE {clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for value in binds {
            q = match value {
                BindValue::Text(v) => q.bind(v),
                BindValue::TextArray(vs) => q.bind(vs),
            };
        }

        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn replace(&self, record: &StoredRecord) -> Result<()> {
        let (deleted_at, deleted_by) = deletion_columns(&record.lifecycle);
        let result = sqlx::query(
            r#"
            UPDATE records
            SET payload = $2,
                updated_by = $3,
                updated_at = $4,
                deleted_at = $5,
                deleted_by = $6
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.payload)
        .bind(record.updated_by.as_ref().map(Json))
        .bind(record.updated_at)
        .bind(deleted_at)
        .bind(deleted_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Record {} not found", record.code)));
        }
        Ok(())
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let kind: String = row.try_get("kind")?;
    let priority: String = row.try_get("priority")?;
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        kind: NotificationKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown notification kind '{kind}'")))?,
        priority: Priority::parse(&priority)
            .ok_or_else(|| Error::Internal(format!("Unknown priority '{priority}'")))?,
        is_action_required: row.try_get("is_action_required")?,
        is_read: row.try_get("is_read")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
        read_at: row.try_get("read_at")?,
    })
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, n: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, recipient_id, title, message, kind, priority,
                 is_action_required, is_read, metadata, created_at, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(n.id)
        .bind(&n.recipient_id)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.kind.as_str())
        .bind(n.priority.as_str())
        .bind(n.is_action_required)
        .bind(n.is_read)
        .bind(&n.metadata)
        .bind(n.created_at)
        .bind(n.read_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_read(
        &self,
        id: Uuid,
        recipient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        let row = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, $3)
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn purge_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry> {
    let action: String = row.try_get("action")?;
    let Json(actor): Json<UserRef> = row.try_get("actor")?;
    Ok(AuditEntry {
        id: row.try_get("id")?,
        actor,
        action: AuditAction::parse(&action)
            .ok_or_else(|| Error::Internal(format!("Unknown audit action '{action}'")))?,
        collection: row.try_get("collection")?,
        record_code: row.try_get("record_code")?,
        request_id: row.try_get("request_id")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

#[async_trait]
impl AuditTrailStore for PostgresStore {
    async fn insert_audit(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_trail
                (id, actor, action, collection, record_code, request_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(Json(&entry.actor))
        .bind(entry.action.as_str())
        .bind(&entry.collection)
        .bind(&entry.record_code)
        .bind(&entry.request_id)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_record(&self, collection: &str, code: &str) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM audit_trail
            WHERE collection = $1 AND record_code = $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(collection)
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }

    async fn purge_audit_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_trail WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
