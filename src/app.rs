use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::info;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::assessment::Assessment;
use crate::config::MonitorConfig;
use crate::metrics::MonitorView;
use crate::monitor::VitalsMonitor;

/// Build the router over a running monitor
///
/// # Routes
/// * `GET /api/vitals` - Current view
/// * `GET /api/vitals/assessment` - Bands of the current readings
/// * `POST /api/vitals/{connect,poll,demo,disconnect}` - Manual controls,
///   answering with the resulting view
pub fn router(monitor: VitalsMonitor) -> Router {
    Router::new()
        .route("/api/vitals", get(get_view))
        .route("/api/vitals/assessment", get(get_assessment))
        .route("/api/vitals/connect", post(connect))
        .route("/api/vitals/poll", post(poll))
        .route("/api/vitals/demo", post(demo))
        .route("/api/vitals/disconnect", post(disconnect))
        .layer(CorsLayer::permissive())
        .with_state(monitor)
}

/// Spawn a monitor for `config` and serve it until Ctrl-C
pub async fn run(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let monitor = VitalsMonitor::from_config(&config).spawn();
    let app = router(monitor.clone());

    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    monitor.stop().await;
    Ok(())
}

async fn get_view(State(monitor): State<VitalsMonitor>) -> Json<MonitorView> {
    Json(monitor.view())
}

async fn get_assessment(State(monitor): State<VitalsMonitor>) -> Response {
    match monitor.view().metrics {
        Some(metrics) => Json(Assessment::of(&metrics)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no readings yet" })),
        )
            .into_response(),
    }
}

async fn connect(State(monitor): State<VitalsMonitor>) -> Json<MonitorView> {
    monitor.connect().await;
    Json(monitor.view())
}

async fn poll(State(monitor): State<VitalsMonitor>) -> Json<MonitorView> {
    monitor.poll().await;
    Json(monitor.view())
}

async fn demo(State(monitor): State<VitalsMonitor>) -> Json<MonitorView> {
    monitor.demo().await;
    Json(monitor.view())
}

async fn disconnect(State(monitor): State<VitalsMonitor>) -> Json<MonitorView> {
    monitor.disconnect().await;
    Json(monitor.view())
}
