use chrono::{DateTime, Utc};

use super::analytics::{AffiliateClick, AffiliateStats, PageView, PageViewStats};
use super::domain::{
    DripStats, DueLead, Lead, LeadCapture, LeadId, LeadPage, LeadQuery, LeadStats, UpsertOutcome,
};
use crate::drip::DelaySchedule;

/// Persistence boundary for subscribers and their drip progress.
///
/// Methods are synchronous; async callers hop onto the blocking pool. Every
/// mutating call takes `now` so tests can drive the clock.
pub trait LeadStore: Send + Sync {
    /// Inserts a new lead or merges the non-empty fields into the existing row
    /// with the same (normalized) email.
    fn upsert_lead(
        &self,
        capture: &LeadCapture,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Subscribed leads whose next step is due at `now`, oldest signup first.
    fn find_due_leads(
        &self,
        schedule: &DelaySchedule,
        batch_limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueLead>, StoreError>;

    /// Records delivery of `step` and advances the lead's counter to
    /// `max(current, step)` in one transaction. Returns `false` when the step
    /// had already been recorded.
    fn record_drip_send(
        &self,
        lead_id: LeadId,
        step: u8,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Marks the owner of `token` unsubscribed and returns their email.
    fn unsubscribe(&self, token: &str, now: DateTime<Utc>) -> Result<String, StoreError>;

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError>;
    fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StoreError>;
    fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, StoreError>;
    fn lead_stats(&self, now: DateTime<Utc>) -> Result<LeadStats, StoreError>;

    /// Flips the subscribed flag and returns the new value.
    fn toggle_subscription(&self, id: LeadId, now: DateTime<Utc>) -> Result<bool, StoreError>;
    fn delete_lead(&self, id: LeadId) -> Result<(), StoreError>;

    /// Every lead, newest first, as CSV text.
    fn export_csv(&self) -> Result<String, StoreError>;
    fn drip_stats(&self, final_step: u8) -> Result<DripStats, StoreError>;
}

/// Page-view and affiliate-click counters backing the admin dashboard.
pub trait AnalyticsStore: Send + Sync {
    fn track_page_view(&self, view: &PageView, now: DateTime<Utc>) -> Result<(), StoreError>;
    fn track_affiliate_click(
        &self,
        click: &AffiliateClick,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    fn page_view_stats(&self, now: DateTime<Utc>) -> Result<PageViewStats, StoreError>;
    fn affiliate_stats(&self, now: DateTime<Utc>) -> Result<AffiliateStats, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid unsubscribe token")]
    InvalidToken,
    #[error("invalid drip step {0}")]
    InvalidStep(u8),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
