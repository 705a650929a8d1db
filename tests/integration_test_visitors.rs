mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{parse_body, visitor_payload, TestApp};
use regex::Regex;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_create_visitor_classifies_and_starts_pending() {
    let app = TestApp::new().await;

    let res = app.request("POST", "/api/visitors", Some(visitor_payload("Meeting with HOD"))).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = parse_body(res).await;
    assert_eq!(body["ok"], true);
    let visitor = &body["visitor"];

    let id_shape = Regex::new(r"^VIS-\d{4}-[0-9a-f]{8}$").unwrap();
    assert!(id_shape.is_match(visitor["id"].as_str().unwrap()), "unexpected id {}", visitor["id"]);
    assert_eq!(visitor["status"], "PENDING");
    assert_eq!(visitor["label"], "MEETING");
    assert_eq!(visitor["labelConfidence"], 0.8);
    assert_eq!(visitor["date"], chrono::Utc::now().date_naive().to_string());
    assert!(visitor.get("approvedAt").is_none());
    assert!(visitor.get("qrUrl").is_none());

    // Intake never enqueues a pass
    assert!(app.queue.jobs().is_empty());
}

#[tokio::test]
async fn test_rule_classifier_is_case_insensitive() {
    let app = TestApp::new().await;

    let visitor = app.create_visitor("JOB INTERVIEW at the placement cell").await;
    assert_eq!(visitor["label"], "INTERVIEW");
    assert_eq!(visitor["labelConfidence"], 0.9);

    let visitor = app.create_visitor("Dropping off a parcel").await;
    assert_eq!(visitor["label"], "DELIVERY");

    let visitor = app.create_visitor("Just looking around").await;
    assert_eq!(visitor["label"], "OTHER");
    assert_eq!(visitor["labelConfidence"], 0.5);
}

#[tokio::test]
async fn test_create_visitor_validation() {
    let app = TestApp::new().await;

    let cases = vec![
        (json!({"lastName": "V", "phone": "123", "email": "a@b.co", "reasonForVisit": "x"}), "firstName is required"),
        (json!({"firstName": "   ", "lastName": "V", "phone": "123", "email": "a@b.co", "reasonForVisit": "x"}), "firstName is required"),
        (json!({"firstName": "A", "lastName": "V", "phone": "123", "email": "not-an-email", "reasonForVisit": "x"}), "email"),
        (json!({"firstName": "A", "lastName": "V", "phone": "call me", "email": "a@b.co", "reasonForVisit": "x"}), "phone"),
        (json!({"firstName": "A".repeat(61), "lastName": "V", "phone": "123", "email": "a@b.co", "reasonForVisit": "x"}), "firstName"),
        (json!({"firstName": "A", "lastName": "V", "phone": "123", "email": "a@b.co", "reasonForVisit": "r".repeat(501)}), "reasonForVisit"),
    ];

    for (payload, expected) in cases {
        let res = app.request("POST", "/api/visitors", Some(payload.clone())).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "payload {} should be rejected", payload);
        let body = parse_body(res).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains(expected), "message {:?} should mention {:?}", message, expected);
    }

    let listed = parse_body(app.request("GET", "/api/visitors", None).await).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;

    let res = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/visitors")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(parse_body(res).await["error"].is_string());
}

#[tokio::test]
async fn test_list_filters_and_lookup() {
    let app = TestApp::new().await;

    let first = app.create_visitor("Campus tour").await;
    let second = app.create_visitor("Seminar on robotics").await;
    let id = second["id"].as_str().unwrap();
    assert_eq!(app.set_status(id, "APPROVED").await.status(), StatusCode::OK);

    // Newest first
    let all = parse_body(app.request("GET", "/api/visitors", None).await).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"], second["id"]);
    assert_eq!(all[1]["id"], first["id"]);

    let pending = parse_body(app.request("GET", "/api/visitors?status=PENDING", None).await).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], first["id"]);

    let today = parse_body(app.request("GET", "/api/visitors?today=1&limit=1", None).await).await;
    assert_eq!(today.as_array().unwrap().len(), 1);

    let bad = app.request("GET", "/api/visitors?status=WANDERING", None).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(bad).await["error"], "Invalid status");

    let found = app.request("GET", &format!("/api/visitors/{}", id), None).await;
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(parse_body(found).await["status"], "APPROVED");

    let missing = app.request("GET", "/api/visitors/VIS-2026-deadbeef", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(parse_body(missing).await["error"], "Visitor not found");
}
