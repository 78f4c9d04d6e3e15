use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::run_blocking;
use crate::error::AppError;
use crate::leads::{AffiliateClick, AnalyticsStore, LeadCapture, LeadStore, PageView};

/// Public signup, unsubscribe, and tracking endpoints.
pub fn lead_router<S>(store: Arc<S>) -> Router
where
    S: LeadStore + AnalyticsStore + 'static,
{
    Router::new()
        .route("/api/v1/leads/subscribe", post(subscribe_handler::<S>))
        .route(
            "/api/v1/leads/unsubscribe/:token",
            get(unsubscribe_handler::<S>),
        )
        .route("/api/v1/track/page-view", post(page_view_handler::<S>))
        .route("/api/v1/track/affiliate", get(affiliate_handler::<S>))
        .with_state(store)
}

pub(crate) async fn subscribe_handler<S>(
    State(store): State<Arc<S>>,
    Json(capture): Json<LeadCapture>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
{
    let outcome = run_blocking(move || Ok(store.upsert_lead(&capture, Utc::now())?)).await?;
    if outcome.is_new {
        info!(lead_id = %outcome.id, "new lead captured");
    }

    let (status, message) = if outcome.is_new {
        (StatusCode::CREATED, "subscribed")
    } else {
        (StatusCode::OK, "already subscribed")
    };
    let body = json!({
        "id": outcome.id,
        "is_new": outcome.is_new,
        "message": message,
    });
    Ok((status, Json(body)).into_response())
}

pub(crate) async fn unsubscribe_handler<S>(
    State(store): State<Arc<S>>,
    Path(token): Path<String>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
{
    let email = run_blocking(move || Ok(store.unsubscribe(&token, Utc::now())?)).await?;
    info!("lead unsubscribed");
    let body = json!({
        "email": email,
        "unsubscribed": true,
    });
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PageViewRequest {
    pub path: String,
    #[serde(default)]
    pub referrer: String,
}

fn header_text(headers: &HeaderMap, name: impl header::AsHeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// First hop of `X-Forwarded-For`, as set by the fronting proxy.
fn client_ip(headers: &HeaderMap) -> String {
    header_text(headers, "x-forwarded-for")
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

pub(crate) async fn page_view_handler<S>(
    State(store): State<Arc<S>>,
    headers: HeaderMap,
    Json(request): Json<PageViewRequest>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
{
    let path = request.path.trim();
    if !path.starts_with('/') {
        let body = json!({ "error": "path must start with '/'" });
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let referrer = if request.referrer.is_empty() {
        header_text(&headers, header::REFERER)
    } else {
        request.referrer
    };
    let view = PageView {
        path: path.to_string(),
        referrer,
        user_agent: header_text(&headers, header::USER_AGENT),
        ip_address: client_ip(&headers),
    };
    run_blocking(move || Ok(store.track_page_view(&view, Utc::now())?)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub struct AffiliateQuery {
    #[serde(default)]
    pub affiliate: String,
    #[serde(default)]
    pub page: String,
}

pub(crate) async fn affiliate_handler<S>(
    State(store): State<Arc<S>>,
    headers: HeaderMap,
    Query(query): Query<AffiliateQuery>,
) -> Result<Response, AppError>
where
    S: LeadStore + AnalyticsStore + 'static,
{
    let affiliate = query.affiliate.trim();
    if affiliate.is_empty() {
        let body = json!({ "error": "affiliate is required" });
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let click = AffiliateClick {
        affiliate: affiliate.to_string(),
        page: query.page,
        ip_address: client_ip(&headers),
    };
    run_blocking(move || Ok(store.track_affiliate_click(&click, Utc::now())?)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::{LeadQuery, SqliteStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open_in_memory().expect("store opens"))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn subscribe_request(body: Value) -> Request<Body> {
        Request::post("/api/v1/leads/subscribe")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn subscribe_creates_then_merges() {
        let store = store();
        let (status, body) = send(
            lead_router(store.clone()),
            subscribe_request(json!({ "email": " Jane@Example.com " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["is_new"], true);

        let (status, body) = send(
            lead_router(store.clone()),
            subscribe_request(json!({ "email": "jane@example.com", "name": "Jane" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_new"], false);

        let page = store.list_leads(&LeadQuery::default()).expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.leads[0].name.as_deref(), Some("Jane"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribe_works_on_a_single_threaded_runtime() {
        let store = store();
        let (status, _) = send(
            lead_router(store.clone()),
            subscribe_request(json!({ "email": "solo@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(store.list_leads(&LeadQuery::default()).expect("list").total, 1);
    }

    #[tokio::test]
    async fn subscribe_rejects_invalid_email() {
        let (status, body) = send(
            lead_router(store()),
            subscribe_request(json!({ "email": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "store error: invalid email address");
    }

    #[tokio::test]
    async fn unsubscribe_by_token() {
        let store = store();
        let outcome = store
            .upsert_lead(
                &LeadCapture {
                    email: "jane@example.com".to_string(),
                    ..LeadCapture::default()
                },
                Utc::now(),
            )
            .expect("lead");
        let token = store
            .fetch_lead(outcome.id)
            .expect("fetch")
            .expect("exists")
            .unsubscribe_token;

        let (status, body) = send(
            lead_router(store.clone()),
            Request::get(format!("/api/v1/leads/unsubscribe/{token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "jane@example.com");

        let (status, _) = send(
            lead_router(store),
            Request::get("/api/v1/leads/unsubscribe/short")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tracking_endpoints_record_events() {
        let store = store();
        let (status, _) = send(
            lead_router(store.clone()),
            Request::post("/api/v1/track/page-view")
                .header("content-type", "application/json")
                .header("user-agent", "test-agent")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(Body::from(json!({ "path": "/calculator" }).to_string()))
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            lead_router(store.clone()),
            Request::get("/api/v1/track/affiliate?affiliate=acme&page=/auto")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            lead_router(store.clone()),
            Request::get("/api/v1/track/affiliate")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let views = store.page_view_stats(Utc::now()).expect("stats");
        assert_eq!(views.total, 1);
        assert_eq!(views.top_pages[0].label, "/calculator");
        let clicks = store.affiliate_stats(Utc::now()).expect("stats");
        assert_eq!(clicks.by_page[0].label, "/auto");
    }
}
