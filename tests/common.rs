#![allow(dead_code)]

use campus_gate::{
    api::router::create_router,
    background::PassWorker,
    config::Config,
    domain::models::pass::{PassJob, PassRequest, JOB_COMPLETED},
    domain::ports::{ArtifactStore, EmailService, LlmService, PassQueue, StoredArtifact, VisitorRepository},
    error::AppError,
    infra::factory::{assemble_state, connect_sqlite, Backends},
    infra::repositories::{
        memory_pass_queue::InMemoryPassQueue, memory_visitor_repo::InMemoryVisitorRepo,
        sqlite_visitor_repo::SqliteVisitorRepo,
    },
    infra::storage::memory_artifact_store::InMemoryArtifactStore,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const PUBLIC_BASE: &str = "http://gate.test";

/// In-memory queue that can be told to refuse new ones. Keeps the last
/// known state of every job, including completed ones the real queue drops.
pub struct RecordingQueue {
    inner: InMemoryPassQueue,
    history: Mutex<Vec<PassJob>>,
    pub fail_enqueue: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self {
            inner: InMemoryPassQueue::new("visitor-pass-requests"),
            history: Mutex::new(Vec::new()),
            fail_enqueue: AtomicBool::new(false),
        }
    }

    pub fn jobs(&self) -> Vec<PassJob> {
        self.history.lock().unwrap().clone()
    }

    fn record(&self, jobs: Vec<PassJob>) {
        let mut history = self.history.lock().unwrap();
        for job in jobs {
            match history.iter_mut().find(|j| j.id == job.id) {
                Some(existing) => *existing = job,
                None => history.push(job),
            }
        }
    }
}

#[async_trait]
impl PassQueue for RecordingQueue {
    async fn enqueue(&self, request: &PassRequest) -> Result<PassJob, AppError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("queue unreachable".into()));
        }
        let job = self.inner.enqueue(request).await?;
        self.record(vec![job.clone()]);
        Ok(job)
    }

    async fn claim(&self, limit: i64) -> Result<Vec<PassJob>, AppError> {
        let jobs = self.inner.claim(limit).await?;
        self.record(jobs.clone());
        Ok(jobs)
    }

    async fn complete(&self, id: &str) -> Result<(), AppError> {
        self.inner.complete(id).await?;
        let mut history = self.history.lock().unwrap();
        if let Some(job) = history.iter_mut().find(|j| j.id == id) {
            job.status = JOB_COMPLETED.to_string();
            job.last_error = None;
        }
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<(), AppError> {
        self.inner.fail(id, error, retry_at).await?;
        self.record(self.inner.snapshot().into_iter().filter(|j| j.id == id).collect());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: Option<String>,
}

pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: AtomicBool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("mail relay down".into()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachment_name: attachment_name.map(str::to_string),
        });
        Ok(())
    }
}

/// Returns a fixed reply, or fails every call when `reply` is `None`.
pub struct MockLlmService {
    reply: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockLlmService {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn generate(
        &self,
        prompt: &str,
        _system_instruction: &str,
        _temperature: f32,
    ) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| AppError::Dependency("model offline".into()))
    }
}

pub struct FlakyArtifactStore {
    inner: InMemoryArtifactStore,
    pub fail: AtomicBool,
}

impl FlakyArtifactStore {
    pub fn new() -> Self {
        Self { inner: InMemoryArtifactStore::new(PUBLIC_BASE), fail: AtomicBool::new(false) }
    }
}

#[async_trait]
impl ArtifactStore for FlakyArtifactStore {
    async fn put(&self, name: &str, content_type: &str, data: Vec<u8>) -> Result<String, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("blob store unavailable".into()));
        }
        self.inner.put(name, content_type, data).await
    }

    async fn fetch(&self, name: &str) -> Result<Option<StoredArtifact>, AppError> {
        self.inner.fetch(name).await
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Sqlite,
    Memory,
}

pub struct TestOptions {
    pub storage: Storage,
    pub llm: Option<Arc<MockLlmService>>,
    pub admin_token: Option<String>,
    pub with_email: bool,
    /// Replaces the default in-memory artifact store.
    pub artifact_store: Option<Arc<dyn ArtifactStore>>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self { storage: Storage::Sqlite, llm: None, admin_token: None, with_email: true, artifact_store: None }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub queue: Arc<RecordingQueue>,
    pub email: Arc<MockEmailService>,
    pub artifacts: Arc<FlakyArtifactStore>,
    pub db_filename: Option<String>,
    admin_token: Option<String>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let (visitor_repo, db_filename): (Arc<dyn VisitorRepository>, Option<String>) = match options.storage {
            Storage::Sqlite => {
                let db_filename = format!("test_{}.db", Uuid::new_v4());
                let pool = connect_sqlite(&format!("sqlite://{}?mode=rwc", db_filename))
                    .await
                    .expect("Failed to open test db");
                (Arc::new(SqliteVisitorRepo::new(pool)), Some(db_filename))
            }
            Storage::Memory => (Arc::new(InMemoryVisitorRepo::new()), None),
        };

        let queue = Arc::new(RecordingQueue::new());
        let email = Arc::new(MockEmailService::new());
        let artifacts = Arc::new(FlakyArtifactStore::new());

        let config = Config {
            port: 0,
            public_base_url: PUBLIC_BASE.to_string(),
            pass_link_secret: "test-secret".to_string(),
            admin_token: options.admin_token.clone(),
            worker_enabled: false,
            ..Config::default()
        };

        let state = assemble_state(
            config,
            Backends {
                visitor_repo,
                pass_queue: queue.clone(),
                artifact_store: options.artifact_store.unwrap_or_else(|| artifacts.clone()),
                email_service: options.with_email.then(|| email.clone() as Arc<dyn EmailService>),
                llm_service: options.llm.map(|llm| llm as Arc<dyn LlmService>),
            },
        )
        .expect("Failed to assemble state");
        let state = Arc::new(state);

        Self {
            router: create_router(state.clone()),
            state,
            queue,
            email,
            artifacts,
            db_filename,
            admin_token: options.admin_token,
        }
    }

    pub fn worker(&self) -> PassWorker {
        PassWorker::new(self.state.clone())
    }

    /// Sends a request, attaching the admin token when one is configured.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.admin_token {
            builder = builder.header("X-Admin-Token", token);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn create_visitor(&self, reason: &str) -> Value {
        let response = self
            .request("POST", "/api/visitors", Some(visitor_payload(reason)))
            .await;
        assert_eq!(response.status(), 201, "visitor creation failed");
        parse_body(response).await["visitor"].clone()
    }

    pub async fn set_status(&self, id: &str, status: &str) -> Response {
        self.request(
            "PATCH",
            &format!("/api/visitors/{}/status", id),
            Some(serde_json::json!({ "status": status, "approvedBy": "desk-1" })),
        )
        .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(db) = &self.db_filename {
            let _ = std::fs::remove_file(db);
            let _ = std::fs::remove_file(format!("{}-wal", db));
            let _ = std::fs::remove_file(format!("{}-shm", db));
        }
    }
}

pub fn visitor_payload(reason: &str) -> Value {
    serde_json::json!({
        "firstName": "Asha",
        "lastName": "Verma",
        "phone": "+91 98765 43210",
        "email": "asha@example.edu",
        "reasonForVisit": reason,
    })
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
