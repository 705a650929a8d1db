use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::domain::models::visitor::{clamp_confidence, VisitorLabel};
use crate::domain::ports::LlmService;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: VisitorLabel,
    pub confidence: f64,
}

impl Classification {
    pub fn other() -> Self {
        Self { label: VisitorLabel::Other, confidence: DEFAULT_CONFIDENCE }
    }
}

/// Labels a free-text reason for visit. Never fails: every implementation
/// degrades to a valid label.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Classification;
}

struct Rule {
    pattern: Regex,
    label: VisitorLabel,
    confidence: f64,
}

fn rule(pattern: &str, label: VisitorLabel, confidence: f64) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("classifier rule compiles"),
        label,
        confidence,
    }
}

// First match wins; interviews and deliveries are checked before the broad
// "meeting" words so "meet the courier" stays a delivery.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)interview|recruit|job application|hiring|placement", VisitorLabel::Interview, 0.9),
        rule(r"(?i)deliver|parcel|package|courier|shipment|supplies", VisitorLabel::Delivery, 0.85),
        rule(r"(?i)\bmeet|appointment|discussion|\bhod\b|\bdean\b|professor", VisitorLabel::Meeting, 0.8),
        rule(r"(?i)\bevent|seminar|workshop|conference|\bfest\b|ceremony|convocation|guest lecture", VisitorLabel::Event, 0.8),
        rule(r"(?i)repair|maintenance|install|technician|\bservic|plumb|electric", VisitorLabel::Service, 0.75),
        rule(r"(?i)admission|\bexam|lecture|\bclass|library|research|thesis|\bcourse", VisitorLabel::Academic, 0.75),
        rule(r"(?i)\badmin|document|certificate|\bfees?\b|transcript|registrar|office work", VisitorLabel::Admin, 0.7),
        rule(r"(?i)\bvisit|\btour|\bparents?\b|family|friend|alumni", VisitorLabel::Visit, 0.65),
    ]
});

/// Deterministic keyword classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_text(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            return Classification::other();
        }
        RULES
            .iter()
            .find(|r| r.pattern.is_match(text))
            .map(|r| Classification { label: r.label, confidence: r.confidence })
            .unwrap_or_else(Classification::other)
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, text: &str) -> Classification {
        self.classify_text(text)
    }
}

/// Model-backed classifier that falls back to the keyword rules.
pub struct LlmClassifier {
    llm: Arc<dyn LlmService>,
    fallback: RuleClassifier,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm, fallback: RuleClassifier }
    }

    fn system_instruction() -> String {
        let labels: Vec<&str> = VisitorLabel::ALL.iter().map(|l| l.as_str()).collect();
        format!(
            "You classify why a visitor is coming to a university campus. \
             Respond ONLY with strict JSON of the form {{\"label\": string, \"confidence\": number}}. \
             The label MUST be exactly one of: {}. The confidence MUST be between 0 and 1.",
            labels.join(", ")
        )
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn classify(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            return Classification::other();
        }

        match self.llm.generate(text, &Self::system_instruction(), 0.0).await {
            Ok(raw) => match parse_classification(&raw) {
                Some(result) => {
                    debug!(label = %result.label, confidence = result.confidence, "model classification");
                    result
                }
                None => {
                    warn!("Model returned an unusable classification, using keyword rules: {:?}", raw);
                    self.fallback.classify_text(text)
                }
            },
            Err(e) => {
                warn!("Classification call failed, using keyword rules: {}", e);
                self.fallback.classify_text(text)
            }
        }
    }
}

#[derive(Deserialize)]
struct RawClassification {
    label: String,
    confidence: f64,
}

/// Parses `{"label": .., "confidence": ..}` out of a model reply, tolerating
/// code fences and surrounding prose.
pub fn parse_classification(raw: &str) -> Option<Classification> {
    let json = extract_json_object(raw)?;
    let parsed: RawClassification = serde_json::from_str(json).ok()?;
    let label = parsed.label.parse::<VisitorLabel>().ok()?;
    if !parsed.confidence.is_finite() {
        return None;
    }
    Some(Classification { label, confidence: clamp_confidence(parsed.confidence) })
}

pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub fn build_classifier(llm: Option<Arc<dyn LlmService>>) -> Arc<dyn Classifier> {
    match llm {
        Some(llm) => Arc::new(LlmClassifier::new(llm)),
        None => Arc::new(RuleClassifier),
    }
}
