//! Subscriber capture, drip progress persistence, and site analytics.

pub mod analytics;
pub mod domain;
pub mod export;
pub mod sqlite;
pub mod store;

pub use analytics::{AffiliateClick, AffiliateStats, DailyCount, PageView, PageViewStats};
pub use domain::{
    normalize_email, DripStats, DueLead, LabelCount, Lead, LeadCapture, LeadId, LeadPage,
    LeadQuery, LeadStats, UpsertOutcome,
};
pub use export::leads_to_csv;
pub use sqlite::SqliteStore;
pub use store::{AnalyticsStore, LeadStore, StoreError};
