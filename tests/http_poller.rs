use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use nexus_vitals::{HttpPoller, TransportError, VitalsFetcher};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn latest(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    // Relays answer with an HTML interstitial unless the skip header is sent
    if headers.get("ngrok-skip-browser-warning").is_none() {
        return Ok(Json(json!({ "interstitial": true })));
    }
    Ok(Json(json!({
        "heart_rate": 74,
        "blood_pressure": { "systolic": 118, "diastolic": 77 },
        "timestamp": "2026-03-01T08:30:00+00:00"
    })))
}

#[tokio::test]
async fn fetches_a_json_snapshot() {
    let base = serve(Router::new().route("/vitals", get(latest))).await;
    let poller = HttpPoller::new(format!("{}/vitals", base));

    let payload = poller.fetch().await.unwrap();
    assert_eq!(payload["heart_rate"], 74);
    assert_eq!(payload["blood_pressure"]["diastolic"], 77);
    println!("✓ Poller sends the relay header and decodes the body");
}

#[tokio::test]
async fn error_status_is_a_transport_error() {
    let app = Router::new().route(
        "/vitals",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
    );
    let base = serve(app).await;
    let poller = HttpPoller::new(format!("{}/vitals", base));

    match poller.fetch().await {
        Err(TransportError::Status(code)) => assert_eq!(code, 503),
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_body_is_a_transport_error() {
    let app = Router::new().route("/vitals", get(|| async { "<html>hello</html>" }));
    let base = serve(app).await;
    let poller = HttpPoller::new(format!("{}/vitals", base));

    assert!(matches!(
        poller.fetch().await,
        Err(TransportError::Payload(_))
    ));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let poller = HttpPoller::new(format!("http://{}/vitals", addr));
    assert!(matches!(poller.fetch().await, Err(TransportError::Http(_))));
}
