use serde::Deserialize;

use crate::domain::services::assistant::VisitorSnapshot;

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const DEFAULT_RECLASSIFY_LIMIT: i64 = 100;

#[derive(Deserialize, Default)]
pub struct ListVisitorsQuery {
    pub status: Option<String>,
    /// Any non-empty value other than `false`/`0` restricts to today (UTC).
    pub today: Option<String>,
    pub limit: Option<i64>,
}

impl ListVisitorsQuery {
    pub fn today_only(&self) -> bool {
        match self.today.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => !v.eq_ignore_ascii_case("false") && v != "0",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub approved_by: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLabelRequest {
    pub label: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ReclassifyAllRequest {
    pub ids: Option<Vec<String>>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SuggestApprovalRequest {
    pub visitor: Option<VisitorSnapshot>,
}

#[derive(Deserialize)]
pub struct PassLinkQuery {
    pub expires: Option<i64>,
    pub sig: Option<String>,
}
