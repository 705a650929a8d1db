use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_NAME_LEN: usize = 60;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_REASON_LEN: usize = 500;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9+()\-. ]*[0-9][0-9+()\-. ]*$").expect("phone pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitorStatus {
    Pending,
    Approved,
    Rejected,
    CheckedIn,
    CheckedOut,
}

impl VisitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorStatus::Pending => "PENDING",
            VisitorStatus::Approved => "APPROVED",
            VisitorStatus::Rejected => "REJECTED",
            VisitorStatus::CheckedIn => "CHECKED_IN",
            VisitorStatus::CheckedOut => "CHECKED_OUT",
        }
    }

    /// Edges of the lifecycle graph. Self-loops are not edges.
    pub fn can_transition_to(&self, target: VisitorStatus) -> bool {
        matches!(
            (self, target),
            (VisitorStatus::Pending, VisitorStatus::Approved)
                | (VisitorStatus::Pending, VisitorStatus::Rejected)
                | (VisitorStatus::Approved, VisitorStatus::CheckedIn)
                | (VisitorStatus::CheckedIn, VisitorStatus::CheckedOut)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitorStatus::Rejected | VisitorStatus::CheckedOut)
    }
}

impl fmt::Display for VisitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(VisitorStatus::Pending),
            "APPROVED" => Ok(VisitorStatus::Approved),
            "REJECTED" => Ok(VisitorStatus::Rejected),
            "CHECKED_IN" => Ok(VisitorStatus::CheckedIn),
            "CHECKED_OUT" => Ok(VisitorStatus::CheckedOut),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitorLabel {
    Meeting,
    Delivery,
    Interview,
    Event,
    Service,
    Academic,
    Admin,
    Visit,
    Other,
}

impl VisitorLabel {
    pub const ALL: [VisitorLabel; 9] = [
        VisitorLabel::Meeting,
        VisitorLabel::Delivery,
        VisitorLabel::Interview,
        VisitorLabel::Event,
        VisitorLabel::Service,
        VisitorLabel::Academic,
        VisitorLabel::Admin,
        VisitorLabel::Visit,
        VisitorLabel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorLabel::Meeting => "MEETING",
            VisitorLabel::Delivery => "DELIVERY",
            VisitorLabel::Interview => "INTERVIEW",
            VisitorLabel::Event => "EVENT",
            VisitorLabel::Service => "SERVICE",
            VisitorLabel::Academic => "ACADEMIC",
            VisitorLabel::Admin => "ADMIN",
            VisitorLabel::Visit => "VISIT",
            VisitorLabel::Other => "OTHER",
        }
    }
}

impl fmt::Display for VisitorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorLabel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        VisitorLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or(AppError::InvalidLabel(s.to_string()))
    }
}

/// Intake payload as submitted by the visitor form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVisitor {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub reason_for_visit: String,
}

impl NewVisitor {
    /// Trims every field and checks presence, length and shape.
    pub fn validated(self) -> Result<Self, AppError> {
        let input = NewVisitor {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            reason_for_visit: self.reason_for_visit.trim().to_string(),
        };

        require("firstName", &input.first_name, MAX_NAME_LEN)?;
        require("lastName", &input.last_name, MAX_NAME_LEN)?;
        require("phone", &input.phone, MAX_PHONE_LEN)?;
        require("email", &input.email, MAX_EMAIL_LEN)?;
        require("reasonForVisit", &input.reason_for_visit, MAX_REASON_LEN)?;

        if !PHONE_RE.is_match(&input.phone) {
            return Err(AppError::Validation("phone must contain digits only (with optional + - ( ) . or spaces)".into()));
        }
        if !EMAIL_RE.is_match(&input.email) {
            return Err(AppError::Validation("email must be a valid email".into()));
        }

        Ok(input)
    }
}

fn require(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub reason_for_visit: String,
    pub label: VisitorLabel,
    pub label_confidence: f64,
    pub status: VisitorStatus,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    Unchanged,
}

impl Visitor {
    pub fn new(input: NewVisitor, label: VisitorLabel, label_confidence: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_visitor_id(now),
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            email: input.email,
            reason_for_visit: input.reason_for_visit,
            label,
            label_confidence: clamp_confidence(label_confidence),
            status: VisitorStatus::Pending,
            date: now.date_naive(),
            created_at: now,
            updated_at: now,
            approved_at: None,
            approved_by: None,
            check_in_at: None,
            check_out_at: None,
            qr_url: None,
        }
    }

    /// Moves the record along the lifecycle graph, stamping the matching
    /// timestamp. Re-approving or re-rejecting is a no-op; every other
    /// missing edge is rejected without touching the record.
    pub fn apply_transition(
        &mut self,
        target: VisitorStatus,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AppError> {
        if self.status == target
            && matches!(target, VisitorStatus::Approved | VisitorStatus::Rejected)
        {
            return Ok(TransitionOutcome::Unchanged);
        }

        if !self.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition { from: self.status, to: target });
        }

        self.status = target;
        self.updated_at = now;

        match target {
            VisitorStatus::Approved => {
                self.approved_at.get_or_insert(now);
                self.approved_by = Some(actor.unwrap_or("admin").to_string());
            }
            VisitorStatus::CheckedIn => {
                self.check_in_at.get_or_insert(now);
            }
            VisitorStatus::CheckedOut => {
                self.check_out_at.get_or_insert(now);
            }
            VisitorStatus::Pending | VisitorStatus::Rejected => {}
        }

        Ok(TransitionOutcome::Applied)
    }

    pub fn set_label(&mut self, label: VisitorLabel, confidence: f64, now: DateTime<Utc>) {
        self.label = label;
        self.label_confidence = clamp_confidence(confidence);
        self.updated_at = now;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email_domain(&self) -> &str {
        self.email.split_once('@').map(|(_, domain)| domain).unwrap_or("")
    }
}

/// `VIS-{year}-{8 hex}`.
pub fn generate_visitor_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("VIS-{}-{}", now.year(), &suffix[..8])
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Flat row shape shared by the SQL repositories.
#[derive(Debug, FromRow)]
pub struct VisitorRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub reason_for_visit: String,
    pub label: String,
    pub label_confidence: f64,
    pub status: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub qr_url: Option<String>,
}

impl TryFrom<VisitorRow> for Visitor {
    type Error = AppError;

    fn try_from(row: VisitorRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<VisitorStatus>().map_err(|_| {
            AppError::InternalWithMsg(format!("Stored visitor {} has unknown status {}", row.id, row.status))
        })?;
        let label = row.label.parse::<VisitorLabel>().unwrap_or(VisitorLabel::Other);

        Ok(Visitor {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            email: row.email,
            reason_for_visit: row.reason_for_visit,
            label,
            label_confidence: clamp_confidence(row.label_confidence),
            status,
            date: row.date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            approved_at: row.approved_at,
            approved_by: row.approved_by,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            qr_url: row.qr_url,
        })
    }
}

/// Predicate for list and count queries. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitorFilter {
    pub status: Option<VisitorStatus>,
    pub date: Option<NaiveDate>,
    pub month_of: Option<NaiveDate>,
}

impl VisitorFilter {
    pub fn with_status(status: VisitorStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self { date: Some(date), ..Self::default() }
    }

    pub fn in_month_of(date: NaiveDate) -> Self {
        Self { month_of: Some(date), ..Self::default() }
    }

    pub fn matches(&self, visitor: &Visitor) -> bool {
        if let Some(status) = self.status
            && visitor.status != status
        {
            return false;
        }
        if let Some(date) = self.date
            && visitor.date != date
        {
            return false;
        }
        if let Some(anchor) = self.month_of {
            let (start, end) = month_bounds(anchor);
            if visitor.date < start || visitor.date >= end {
                return false;
            }
        }
        true
    }
}

/// Half-open `[first of month, first of next month)` around `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let end = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX);
    (start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub total_today: i64,
    pub inside_now: i64,
    pub pending: i64,
    pub month_total: i64,
}
