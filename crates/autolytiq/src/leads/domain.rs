use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::StoreError;

pub(crate) const DEFAULT_SOURCE: &str = "calculator";
pub(crate) const UNSUBSCRIBE_TOKEN_LEN: usize = 64;
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Row identifier for a captured lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub i64);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A newsletter subscriber captured from a calculator or signup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub email: String,
    pub name: Option<String>,
    pub income_range: Option<String>,
    pub source: String,
    pub subscribed: bool,
    #[serde(skip_serializing)]
    pub unsubscribe_token: String,
    /// Highest drip step delivered so far (0 before the welcome email).
    pub last_email_sent: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields submitted when a visitor signs up. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadCapture {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub income_range: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: LeadId,
    pub is_new: bool,
}

/// Subscriber whose next drip email is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueLead {
    pub id: LeadId,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub unsubscribe_token: String,
    pub next_step: u8,
    pub signed_up_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadQuery {
    #[serde(default = "LeadQuery::first_page")]
    pub page: u32,
    #[serde(default = "LeadQuery::default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub search: Option<String>,
}

impl LeadQuery {
    pub const MAX_LIMIT: u32 = 200;

    fn first_page() -> u32 {
        1
    }

    fn default_limit() -> u32 {
        20
    }

    /// Clamps page and limit into the supported range.
    pub fn normalized(&self) -> Self {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            page: self.page.max(1),
            limit: match self.limit {
                0 => Self::default_limit(),
                limit => limit.min(Self::MAX_LIMIT),
            },
            search,
        }
    }

    pub(crate) fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for LeadQuery {
    fn default() -> Self {
        Self {
            page: Self::first_page(),
            limit: Self::default_limit(),
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadStats {
    pub total: u64,
    pub subscribed: u64,
    pub unsubscribed: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
    pub by_source: Vec<LabelCount>,
    pub by_income: Vec<LabelCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DripStats {
    pub total_sent: u64,
    pub step1_sent: u64,
    pub step8_sent: u64,
    /// Subscribed leads that have not finished the sequence.
    pub pending: u64,
}

/// Trims and lower-cases an address, rejecting values without an `@`.
pub fn normalize_email(raw: &str) -> Result<String, StoreError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(StoreError::InvalidEmail),
    }
}

/// 64 lowercase hex characters drawn from two random v4 UUIDs.
pub(crate) fn generate_unsubscribe_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub(crate) fn to_db_timestamp(at: DateTime<Utc>) -> String {
    at.format(DB_TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, DB_TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}
