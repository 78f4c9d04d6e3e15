use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::auth::{require_admin_token, AdminToken};
use super::run_blocking;
use crate::drip::{DripScheduler, MailSender};
use crate::error::AppError;
use crate::leads::{
    AffiliateStats, AnalyticsStore, DripStats, Lead, LeadId, LeadQuery, LeadStats, LeadStore,
    PageViewStats,
};

const RECENT_LEADS: u32 = 5;

/// Dependencies shared by the admin handlers.
pub struct AdminState<S: ?Sized, M: ?Sized> {
    pub store: Arc<S>,
    pub drip: Arc<DripScheduler<S, M>>,
}

/// Lead management, drip control, and analytics under `/api/v1/admin`, guarded
/// by the bearer token.
pub fn admin_router<S, M>(state: Arc<AdminState<S, M>>, token: AdminToken) -> Router
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/admin/leads", get(list_handler::<S, M>))
        .route("/api/v1/admin/leads/export.csv", get(export_handler::<S, M>))
        .route("/api/v1/admin/leads/:id", delete(delete_handler::<S, M>))
        .route("/api/v1/admin/leads/:id/toggle", post(toggle_handler::<S, M>))
        .route("/api/v1/admin/stats", get(stats_handler::<S, M>))
        .route("/api/v1/admin/drip/stats", get(drip_stats_handler::<S, M>))
        .route("/api/v1/admin/drip/run", post(drip_run_handler::<S, M>))
        .route("/api/v1/admin/analytics", get(analytics_handler::<S, M>))
        .route_layer(middleware::from_fn_with_state(token, require_admin_token))
        .with_state(state)
}

pub(crate) async fn list_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
    Query(query): Query<LeadQuery>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let page = run_blocking(move || Ok(state.store.list_leads(&query)?)).await?;
    Ok((StatusCode::OK, Json(page)).into_response())
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub leads: LeadStats,
    pub recent: Vec<Lead>,
    pub drip: DripStats,
}

pub(crate) async fn stats_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let stats = run_blocking(move || {
        Ok(DashboardStats {
            leads: state.store.lead_stats(Utc::now())?,
            recent: state.store.recent_leads(RECENT_LEADS)?,
            drip: state.drip.stats()?,
        })
    })
    .await?;
    Ok((StatusCode::OK, Json(stats)).into_response())
}

pub(crate) async fn toggle_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let id = LeadId(id);
    let subscribed =
        run_blocking(move || Ok(state.store.toggle_subscription(id, Utc::now())?)).await?;
    info!(lead_id = %id, subscribed, "lead subscription toggled");
    let body = json!({ "id": id, "subscribed": subscribed });
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub(crate) async fn delete_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let id = LeadId(id);
    run_blocking(move || Ok(state.store.delete_lead(id)?)).await?;
    info!(lead_id = %id, "lead deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn export_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let csv = run_blocking(move || Ok(state.store.export_csv()?)).await?;
    let disposition = format!(
        "attachment; filename=\"leads-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

pub(crate) async fn drip_stats_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let stats = run_blocking(move || Ok(state.drip.stats()?)).await?;
    Ok((StatusCode::OK, Json(stats)).into_response())
}

pub(crate) async fn drip_run_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let summary = run_blocking(move || Ok(state.drip.run_once(Utc::now())?)).await?;
    info!(sent = summary.sent, "manual drip run finished");
    Ok((StatusCode::OK, Json(summary)).into_response())
}

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub page_views: PageViewStats,
    pub affiliates: AffiliateStats,
}

pub(crate) async fn analytics_handler<S, M>(
    State(state): State<Arc<AdminState<S, M>>>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
    M: MailSender + ?Sized + 'static,
{
    let report = run_blocking(move || {
        let now = Utc::now();
        Ok(AnalyticsReport {
            page_views: state.store.page_view_stats(now)?,
            affiliates: state.store.affiliate_stats(now)?,
        })
    })
    .await?;
    Ok((StatusCode::OK, Json(report)).into_response())
}
