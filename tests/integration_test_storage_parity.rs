mod common;

use campus_gate::domain::models::visitor::{
    NewVisitor, Visitor, VisitorFilter, VisitorLabel, VisitorStatus,
};
use campus_gate::domain::ports::VisitorRepository;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{Storage, TestApp, TestOptions};
use std::sync::Arc;

fn visitor_at(at: chrono::DateTime<Utc>, status: VisitorStatus) -> Visitor {
    let input = NewVisitor {
        first_name: "Ravi".into(),
        last_name: "K".into(),
        phone: "0123456789".into(),
        email: "ravi@example.in".into(),
        reason_for_visit: "Thesis discussion".into(),
    };
    let mut v = Visitor::new(input, VisitorLabel::Academic, 0.75, at);
    v.status = status;
    v
}

async fn seed(repo: &Arc<dyn VisitorRepository>) -> Vec<Visitor> {
    let rows = vec![
        visitor_at(Utc.with_ymd_and_hms(2026, 2, 27, 9, 0, 0).unwrap(), VisitorStatus::CheckedOut),
        visitor_at(Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap(), VisitorStatus::Rejected),
        visitor_at(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(), VisitorStatus::CheckedIn),
        visitor_at(Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(), VisitorStatus::Pending),
        visitor_at(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(), VisitorStatus::Pending),
    ];
    for v in &rows {
        repo.upsert(v).await.unwrap();
    }
    rows
}

async fn observe(storage: Storage) -> (Vec<i64>, Visitor) {
    let app = TestApp::with_options(TestOptions { storage, ..Default::default() }).await;
    let repo = app.state.visitor_repo.clone();
    let rows = seed(&repo).await;
    let march_first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

    let counts = vec![
        repo.count(&VisitorFilter::default()).await.unwrap(),
        repo.count(&VisitorFilter::on_date(march_first)).await.unwrap(),
        repo.count(&VisitorFilter::in_month_of(march_first)).await.unwrap(),
        repo.count(&VisitorFilter::in_month_of(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap())).await.unwrap(),
        repo.count(&VisitorFilter::with_status(VisitorStatus::Pending)).await.unwrap(),
        repo.count(&VisitorFilter { status: Some(VisitorStatus::Pending), month_of: Some(march_first), ..Default::default() }).await.unwrap(),
    ];

    let order: Vec<String> = repo
        .list(&VisitorFilter::default(), 3)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    let expected: Vec<String> = rows.iter().rev().take(3).map(|v| v.id.clone()).collect();
    assert_eq!(order, expected);

    // Round trip through the store keeps every field
    let mut updated = rows[3].clone();
    updated.status = VisitorStatus::Approved;
    updated.approved_at = Some(updated.created_at + Duration::minutes(5));
    updated.approved_by = Some("desk".into());
    updated.qr_url = Some("http://gate.test/passes/x.svg".into());
    repo.upsert(&updated).await.unwrap();
    let stored = repo.find_by_id(&updated.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VisitorStatus::Approved);
    assert_eq!(stored.approved_by.as_deref(), Some("desk"));
    assert_eq!(stored.qr_url, updated.qr_url);
    assert!(repo.find_by_id("VIS-2026-nothere0").await.unwrap().is_none());

    (counts, stored)
}

#[tokio::test]
async fn test_sqlite_and_memory_agree() {
    let (sqlite_counts, sqlite_row) = observe(Storage::Sqlite).await;
    let (memory_counts, memory_row) = observe(Storage::Memory).await;

    assert_eq!(sqlite_counts, vec![5, 2, 3, 2, 2, 2]);
    assert_eq!(sqlite_counts, memory_counts);
    assert_eq!(sqlite_row.label, memory_row.label);
    assert_eq!(sqlite_row.date, memory_row.date);
}

#[tokio::test]
async fn test_list_limit_is_capped() {
    let app = TestApp::with_options(TestOptions { storage: Storage::Memory, ..Default::default() }).await;
    let repo = app.state.visitor_repo.clone();
    seed(&repo).await;

    assert_eq!(repo.list(&VisitorFilter::default(), 0).await.unwrap().len(), 1);
    assert_eq!(repo.list(&VisitorFilter::default(), 10_000).await.unwrap().len(), 5);
}
