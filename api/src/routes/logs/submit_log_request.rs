use serde::Deserialize;

/// Request payload for `POST /api/logs/submit`.
///
/// Missing fields deserialize to empty strings and are rejected by the
/// pipeline's validation with a field-specific message.
#[derive(Debug, Deserialize)]
pub struct SubmitLogRequest {
    /// Submitting principal.
    #[serde(default)]
    pub owner: Option<String>,
    /// Older clients send the principal as `userId`; `owner` wins when both are set.
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    /// Raw, unmasked log text.
    #[serde(default, rename = "rawLog")]
    pub raw_log: String,
}

impl SubmitLogRequest {
    pub fn owner(&self) -> &str {
        pick_owner(&self.owner, &self.user_id)
    }
}

/// Query for `GET /api/logs/history`; same `owner`/`userId` rule as submission.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

impl HistoryQuery {
    pub fn owner(&self) -> &str {
        pick_owner(&self.owner, &self.user_id)
    }
}

fn pick_owner<'a>(owner: &'a Option<String>, user_id: &'a Option<String>) -> &'a str {
    owner
        .as_deref()
        .filter(|o| !o.trim().is_empty())
        .or(user_id.as_deref())
        .unwrap_or_default()
}
