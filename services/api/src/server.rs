use crate::cli::ServeArgs;
use crate::infra::{build_drip, drip_cadence, AppState};
use crate::routes::with_operational_routes;
use autolytiq::config::AppConfig;
use autolytiq::error::AppError;
use autolytiq::leads::SqliteStore;
use autolytiq::telemetry;
use autolytiq::web::{api_router, AdminToken, CalculatorTables};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    info!(path = %config.database.path.display(), "lead store opened");

    let drip = build_drip(&config, Arc::clone(&store))?;
    let ticker = if config.drip.enabled {
        Some(Arc::clone(&drip).spawn(drip_cadence(&config)))
    } else {
        info!("background drip scheduler disabled");
        None
    };

    if config.site.admin_token.is_none() {
        warn!("APP_ADMIN_TOKEN is unset; admin routes will answer 503");
    }
    let admin_token = AdminToken::new(config.site.admin_token.clone());

    let api = api_router(
        store,
        drip,
        Arc::new(CalculatorTables::default()),
        admin_token,
    );
    let app = with_operational_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, public_url = %config.site.public_url, "autolytiq api ready");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    if let Some((cancel, handle)) = ticker {
        cancel.cancel();
        if let Err(err) = handle.await {
            warn!(error = %err, "drip scheduler did not stop cleanly");
        }
    }

    served?;
    info!("autolytiq api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
