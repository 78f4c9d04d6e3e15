//! HTTP surface: calculators, lead capture and tracking, and the admin API.

pub mod admin;
pub mod auth;
pub mod calculators;
pub mod leads;

use std::sync::Arc;

use axum::Router;

use crate::drip::{DripScheduler, MailSender};
use crate::error::AppError;
use crate::leads::{AnalyticsStore, LeadStore};

pub use admin::{admin_router, AdminState};
pub use auth::{require_admin_token, AdminToken};
pub use calculators::{calculator_router, CalculatorTables};
pub use leads::lead_router;

/// Runs synchronous store work on the blocking pool so SQLite calls never
/// stall the async workers.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?
}

/// Every `/api/v1` route, ready to be merged into the service router.
pub fn api_router<S, M>(
    store: Arc<S>,
    drip: Arc<DripScheduler<S, M>>,
    tables: Arc<CalculatorTables>,
    admin_token: AdminToken,
) -> Router
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let admin = Arc::new(AdminState {
        store: Arc::clone(&store),
        drip,
    });

    Router::new()
        .merge(calculator_router(tables))
        .merge(lead_router(store))
        .merge(admin_router(admin, admin_token))
}
