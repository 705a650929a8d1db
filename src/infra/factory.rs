use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::domain::ports::{ArtifactStore, EmailService, LlmService, PassQueue, VisitorRepository};
use crate::domain::services::{
    assistant::Assistant, classifier::build_classifier, visitor_service::VisitorService,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::infra::ai::chat_completion_service::ChatCompletionService;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::pass::link_signer::PassLinkSigner;
use crate::infra::storage::{
    http_artifact_store::HttpArtifactStore, memory_artifact_store::InMemoryArtifactStore,
};
use crate::infra::repositories::{
    memory_pass_queue::InMemoryPassQueue, memory_visitor_repo::InMemoryVisitorRepo,
    postgres_pass_queue::PostgresPassQueue, postgres_visitor_repo::PostgresVisitorRepo,
    sqlite_pass_queue::SqlitePassQueue, sqlite_visitor_repo::SqliteVisitorRepo,
};

pub const PASS_EMAIL_TEMPLATE: &str = "pass_email.html";

/// The swappable adapters behind an `AppState`.
pub struct Backends {
    pub visitor_repo: Arc<dyn VisitorRepository>,
    pub pass_queue: Arc<dyn PassQueue>,
    pub artifact_store: Arc<dyn ArtifactStore>,
    pub email_service: Option<Arc<dyn EmailService>>,
    pub llm_service: Option<Arc<dyn LlmService>>,
}

enum Pool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

pub fn load_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_template(PASS_EMAIL_TEMPLATE, include_str!("../templates/pass_email.html"))
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to load pass email template: {}", e)))?;
    Ok(tera)
}

/// Wires services on top of already-built adapters.
pub fn assemble_state(config: Config, backends: Backends) -> Result<AppState, AppError> {
    let classifier = build_classifier(backends.llm_service.clone());
    let visitor_service = Arc::new(VisitorService::new(
        backends.visitor_repo.clone(),
        classifier,
        backends.pass_queue.clone(),
    ));
    let assistant = Arc::new(Assistant::new(visitor_service.clone(), backends.llm_service.clone()));

    Ok(AppState {
        link_signer: PassLinkSigner::new(config.pass_link_secret.clone()),
        templates: Arc::new(load_templates()?),
        config,
        visitor_repo: backends.visitor_repo,
        pass_queue: backends.pass_queue,
        artifact_store: backends.artifact_store,
        email_service: backends.email_service,
        llm_service: backends.llm_service,
        visitor_service,
        assistant,
    })
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let visitor_repo: Arc<dyn VisitorRepository> = match &config.database_url {
        Some(url) => match connect(url).await? {
            Pool::Postgres(pool) => Arc::new(PostgresVisitorRepo::new(pool)),
            Pool::Sqlite(pool) => Arc::new(SqliteVisitorRepo::new(pool)),
        },
        None => {
            warn!("DATABASE_URL not set, visitors are kept in memory and lost on restart");
            Arc::new(InMemoryVisitorRepo::new())
        }
    };

    let queue_name = config.pass_queue_name.clone();
    let pass_queue: Arc<dyn PassQueue> = match &config.pass_queue_url {
        Some(url) => match connect(url).await? {
            Pool::Postgres(pool) => Arc::new(PostgresPassQueue::new(pool, queue_name)),
            Pool::Sqlite(pool) => Arc::new(SqlitePassQueue::new(pool, queue_name)),
        },
        None => {
            info!("PASS_QUEUE_URL not set, using in-process pass queue");
            Arc::new(InMemoryPassQueue::new(queue_name))
        }
    };

    let artifact_store: Arc<dyn ArtifactStore> = match &config.blob {
        Some(blob) => Arc::new(HttpArtifactStore::new(blob)),
        None => Arc::new(InMemoryArtifactStore::new(&config.public_base_url)),
    };

    let email_service: Option<Arc<dyn EmailService>> = match &config.mail {
        Some(mail) => Some(Arc::new(HttpEmailService::new(mail))),
        None => {
            warn!("MAIL_SERVICE_URL not set, pass emails will be skipped");
            None
        }
    };

    let llm_service: Option<Arc<dyn LlmService>> = match &config.llm {
        Some(llm) => Some(Arc::new(ChatCompletionService::new(llm))),
        None => {
            info!("Model endpoint not configured, using rule-based classification");
            None
        }
    };

    assemble_state(
        config.clone(),
        Backends { visitor_repo, pass_queue, artifact_store, email_service, llm_service },
    )
}

async fn connect(database_url: &str) -> Result<Pool, AppError> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts: PgConnectOptions = database_url.parse().map_err(AppError::Database)?;
        let opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;
        Ok(Pool::Postgres(pool))
    } else {
        info!("Initializing SQLite connection with WAL Mode...");
        Ok(Pool::Sqlite(connect_sqlite(database_url).await?))
    }
}

pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    run_sqlite_migrations(&pool).await?;
    Ok(pool)
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}
