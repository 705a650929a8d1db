use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::domain::models::visitor::{clamp_confidence, Visitor, VisitorLabel, VisitorStats};
use crate::domain::ports::LlmService;
use crate::domain::services::classifier::extract_json_object;
use crate::domain::services::visitor_service::{VisitorService, RECENT_LIMIT};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    #[serde(flatten)]
    pub stats: VisitorStats,
    pub recent_purposes: Vec<VisitorLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationsSummary {
    pub summary: String,
    pub metrics: SummaryMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Approve,
    Deny,
    Review,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Approve => "APPROVE",
            Decision::Deny => "DENY",
            Decision::Review => "REVIEW",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSuggestion {
    pub decision: Decision,
    pub confidence: f64,
    pub reason: String,
}

impl ApprovalSuggestion {
    pub fn insufficient_data() -> Self {
        Self {
            decision: Decision::Review,
            confidence: 0.5,
            reason: "Insufficient data".to_string(),
        }
    }
}

/// The subset of a visitor the approval assistant looks at.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisitorSnapshot {
    pub reason_for_visit: String,
    pub label: Option<String>,
    pub email: String,
}

impl From<&Visitor> for VisitorSnapshot {
    fn from(v: &Visitor) -> Self {
        Self {
            reason_for_visit: v.reason_for_visit.clone(),
            label: Some(v.label.to_string()),
            email: v.email.clone(),
        }
    }
}

pub fn fallback_summary(stats: &VisitorStats) -> String {
    format!(
        "Today: {} visitors; {} inside; {} pending; month total: {}.",
        stats.total_today, stats.inside_now, stats.pending, stats.month_total
    )
}

/// Digest and decision helpers for the admin desk. Model failures always
/// degrade to a deterministic answer.
pub struct Assistant {
    visitors: Arc<VisitorService>,
    llm: Option<Arc<dyn LlmService>>,
}

impl Assistant {
    pub fn new(visitors: Arc<VisitorService>, llm: Option<Arc<dyn LlmService>>) -> Self {
        Self { visitors, llm }
    }

    /// Errors only when the store itself fails.
    pub async fn summary(&self) -> Result<OperationsSummary, AppError> {
        let (stats, recent) = tokio::try_join!(self.visitors.stats(), self.visitors.recent(RECENT_LIMIT))?;
        let metrics = SummaryMetrics {
            stats,
            recent_purposes: recent.iter().map(|v| v.label).collect(),
        };

        let mut summary = fallback_summary(&stats);

        if let Some(llm) = &self.llm {
            let context = serde_json::to_string(&metrics).unwrap_or_default();
            let prompt = format!(
                "Summarize today's visitor status in 3-4 sentences. Context (JSON): {}",
                context
            );
            match llm
                .generate(&prompt, "You are a concise operations assistant for a campus visitor desk.", 0.2)
                .await
            {
                Ok(text) if !text.trim().is_empty() => summary = text.trim().to_string(),
                Ok(_) => warn!("Summary model returned empty text, using template"),
                Err(e) => warn!("Summary generation failed, using template: {}", e),
            }
        }

        Ok(OperationsSummary { summary, metrics })
    }

    pub async fn suggest_approval(&self, visitor: &VisitorSnapshot) -> ApprovalSuggestion {
        let Some(llm) = &self.llm else {
            return ApprovalSuggestion::insufficient_data();
        };

        let email_domain = visitor.email.split_once('@').map(|(_, d)| d).unwrap_or("");
        let prompt = format!(
            "Visitor: {}",
            json!({
                "reasonForVisit": visitor.reason_for_visit,
                "label": visitor.label.as_deref().unwrap_or("OTHER"),
                "emailDomain": email_domain,
            })
        );
        let system = "You are a risk-aware gate assistant. Respond ONLY with valid JSON \
            {\"decision\": \"APPROVE\"|\"DENY\"|\"REVIEW\", \"confidence\": number between 0 and 1, \"reason\": string}. \
            Be conservative.";

        match llm.generate(&prompt, system, 0.0).await {
            Ok(raw) => parse_suggestion(&raw).unwrap_or_else(|| {
                warn!("Suggestion model returned unusable output: {:?}", raw);
                ApprovalSuggestion::insufficient_data()
            }),
            Err(e) => {
                warn!("Suggestion generation failed: {}", e);
                ApprovalSuggestion::insufficient_data()
            }
        }
    }
}

pub fn parse_suggestion(raw: &str) -> Option<ApprovalSuggestion> {
    let mut suggestion: ApprovalSuggestion = serde_json::from_str(extract_json_object(raw)?).ok()?;
    if !suggestion.confidence.is_finite() {
        return None;
    }
    suggestion.confidence = clamp_confidence(suggestion.confidence);
    Some(suggestion)
}
