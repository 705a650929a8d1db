use crate::domain::{
    models::visitor::{Visitor, VisitorFilter},
    ports::{clamp_limit, VisitorRepository},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Process-local store used when no database is configured. Contents are
/// lost on restart.
#[derive(Default)]
pub struct InMemoryVisitorRepo {
    visitors: RwLock<Vec<Visitor>>,
}

impl InMemoryVisitorRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitorRepository for InMemoryVisitorRepo {
    async fn upsert(&self, visitor: &Visitor) -> Result<Visitor, AppError> {
        let mut guard = self.visitors.write().await;
        match guard.iter_mut().find(|v| v.id == visitor.id) {
            Some(existing) => *existing = visitor.clone(),
            None => guard.push(visitor.clone()),
        }
        Ok(visitor.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Visitor>, AppError> {
        let guard = self.visitors.read().await;
        Ok(guard.iter().find(|v| v.id == id).cloned())
    }

    async fn list(&self, filter: &VisitorFilter, limit: i64) -> Result<Vec<Visitor>, AppError> {
        let guard = self.visitors.read().await;
        let mut rows: Vec<Visitor> = guard.iter().filter(|v| filter.matches(v)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        rows.truncate(clamp_limit(limit) as usize);
        Ok(rows)
    }

    async fn count(&self, filter: &VisitorFilter) -> Result<i64, AppError> {
        let guard = self.visitors.read().await;
        Ok(guard.iter().filter(|v| filter.matches(v)).count() as i64)
    }

    async fn set_qr_url(&self, id: &str, qr_url: &str, now: DateTime<Utc>) -> Result<Option<Visitor>, AppError> {
        let mut guard = self.visitors.write().await;
        Ok(guard.iter_mut().find(|v| v.id == id).map(|v| {
            v.qr_url = Some(qr_url.to_string());
            v.updated_at = now;
            v.clone()
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::visitor::{NewVisitor, VisitorLabel, VisitorStatus};
    use chrono::{Duration, Utc};

    fn visitor(offset_secs: i64) -> Visitor {
        let input = NewVisitor {
            first_name: "Ada".into(),
            last_name: "L".into(),
            phone: "555".into(),
            email: "ada@example.org".into(),
            reason_for_visit: "tour".into(),
        };
        Visitor::new(input, VisitorLabel::Visit, 0.65, Utc::now() + Duration::seconds(offset_secs))
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let repo = InMemoryVisitorRepo::new();
        let mut v = visitor(0);
        repo.upsert(&v).await.unwrap();
        v.status = VisitorStatus::Approved;
        repo.upsert(&v).await.unwrap();

        assert_eq!(repo.count(&VisitorFilter::default()).await.unwrap(), 1);
        assert_eq!(repo.find_by_id(&v.id).await.unwrap().unwrap().status, VisitorStatus::Approved);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_capped() {
        let repo = InMemoryVisitorRepo::new();
        let older = visitor(-60);
        let newer = visitor(0);
        repo.upsert(&older).await.unwrap();
        repo.upsert(&newer).await.unwrap();

        let rows = repo.list(&VisitorFilter::default(), 10).await.unwrap();
        assert_eq!(rows[0].id, newer.id);
        assert_eq!(rows[1].id, older.id);

        let one = repo.list(&VisitorFilter::default(), 1).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_set_qr_url_leaves_lifecycle_alone() {
        let repo = InMemoryVisitorRepo::new();
        let mut v = visitor(0);
        v.status = VisitorStatus::CheckedIn;
        v.check_in_at = Some(v.created_at);
        repo.upsert(&v).await.unwrap();

        let patched = repo.set_qr_url(&v.id, "http://gate/passes/a.svg", Utc::now()).await.unwrap().unwrap();
        assert_eq!(patched.status, VisitorStatus::CheckedIn);
        assert_eq!(patched.check_in_at, v.check_in_at);
        assert_eq!(patched.qr_url.as_deref(), Some("http://gate/passes/a.svg"));

        assert!(repo.set_qr_url("VIS-2026-missing0", "x", Utc::now()).await.unwrap().is_none());
    }
}
