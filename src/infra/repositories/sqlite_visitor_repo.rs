use crate::domain::{
    models::visitor::{month_bounds, Visitor, VisitorFilter, VisitorRow},
    ports::{clamp_limit, VisitorRepository},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub struct SqliteVisitorRepo {
    pool: SqlitePool,
}

impl SqliteVisitorRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &VisitorFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(date) = filter.date {
        builder.push(" AND date = ").push_bind(date);
    }
    if let Some(anchor) = filter.month_of {
        let (start, end) = month_bounds(anchor);
        builder.push(" AND date >= ").push_bind(start);
        builder.push(" AND date < ").push_bind(end);
    }
}

#[async_trait]
impl VisitorRepository for SqliteVisitorRepo {
    async fn upsert(&self, visitor: &Visitor) -> Result<Visitor, AppError> {
        let row = sqlx::query_as::<_, VisitorRow>(
            "INSERT INTO visitors (id, first_name, last_name, phone, email, reason_for_visit, label, label_confidence, status, date, created_at, updated_at, approved_at, approved_by, check_in_at, check_out_at, qr_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name, last_name = excluded.last_name, phone = excluded.phone,
                email = excluded.email, reason_for_visit = excluded.reason_for_visit, label = excluded.label,
                label_confidence = excluded.label_confidence, status = excluded.status, date = excluded.date,
                updated_at = excluded.updated_at, approved_at = excluded.approved_at, approved_by = excluded.approved_by,
                check_in_at = excluded.check_in_at, check_out_at = excluded.check_out_at, qr_url = excluded.qr_url
             RETURNING *"
        )
            .bind(&visitor.id).bind(&visitor.first_name).bind(&visitor.last_name).bind(&visitor.phone)
            .bind(&visitor.email).bind(&visitor.reason_for_visit).bind(visitor.label.as_str())
            .bind(visitor.label_confidence).bind(visitor.status.as_str()).bind(visitor.date)
            .bind(visitor.created_at).bind(visitor.updated_at).bind(visitor.approved_at)
            .bind(&visitor.approved_by).bind(visitor.check_in_at).bind(visitor.check_out_at).bind(&visitor.qr_url)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Visitor::try_from(row)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Visitor>, AppError> {
        sqlx::query_as::<_, VisitorRow>("SELECT * FROM visitors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(Visitor::try_from)
            .transpose()
    }

    async fn list(&self, filter: &VisitorFilter, limit: i64) -> Result<Vec<Visitor>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM visitors");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(clamp_limit(limit));

        builder
            .build_query_as::<VisitorRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?
            .into_iter()
            .map(Visitor::try_from)
            .collect()
    }

    async fn count(&self, filter: &VisitorFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM visitors");
        push_filter(&mut builder, filter);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_qr_url(&self, id: &str, qr_url: &str, now: DateTime<Utc>) -> Result<Option<Visitor>, AppError> {
        sqlx::query_as::<_, VisitorRow>(
            "UPDATE visitors SET qr_url = ?, updated_at = ? WHERE id = ? RETURNING *"
        )
            .bind(qr_url)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(Visitor::try_from)
            .transpose()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
