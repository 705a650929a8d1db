use std::sync::Arc;
use crate::domain::ports::{ArtifactStore, EmailService, LlmService, PassQueue, VisitorRepository};
use crate::domain::services::{assistant::Assistant, visitor_service::VisitorService};
use crate::infra::pass::link_signer::PassLinkSigner;
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub visitor_repo: Arc<dyn VisitorRepository>,
    pub pass_queue: Arc<dyn PassQueue>,
    pub artifact_store: Arc<dyn ArtifactStore>,
    pub email_service: Option<Arc<dyn EmailService>>,
    pub llm_service: Option<Arc<dyn LlmService>>,
    pub visitor_service: Arc<VisitorService>,
    pub assistant: Arc<Assistant>,
    pub link_signer: PassLinkSigner,
    pub templates: Arc<Tera>,
}
