#![cfg(feature = "web")]

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use std::sync::Arc;

use common::{FakeFeed, FakeFetcher, OnOpen, Reply, builder, settle};
use nexus_vitals::{MonitorView, app};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test(start_paused = true)]
async fn view_is_served_as_json() {
    let feed = FakeFeed::scripted(&[OnOpen::Accept]);
    let monitor = builder(&feed, &FakeFetcher::default()).spawn();
    let app = app::router(monitor);
    settle().await;
    feed.send(r#"{"heartRate": 72, "bloodOxygenLevel": 98}"#);
    settle().await;

    let (status, body) = call(&app, Method::GET, "/api/vitals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "connected");
    assert_eq!(body["status"]["via"], "websocket");
    assert_eq!(body["metrics"]["heartRate"], 72);
    assert_eq!(body["synthetic"], false);

    let view: MonitorView = serde_json::from_value(body).unwrap();
    assert_eq!(view.metrics.unwrap().blood_oxygen_level, 98);
}

#[tokio::test(start_paused = true)]
async fn assessment_needs_readings() {
    let monitor = builder(&FakeFeed::default(), &FakeFetcher::default())
        .autoconnect(false)
        .spawn();
    let app = app::router(monitor);

    let (status, _) = call(&app, Method::GET, "/api/vitals/assessment").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::POST, "/api/vitals/demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["synthetic"], true);

    let (status, body) = call(&app, Method::GET, "/api/vitals/assessment").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["heartRate"].is_string());
    assert!(body["bodyTemperature"].is_string());
}

#[tokio::test(start_paused = true)]
async fn controls_return_the_resulting_view() {
    let feed = FakeFeed::default();
    let fetcher = FakeFetcher::default();
    // Never answered, so the poll stays in progress
    fetcher.reply(Reply::Gate(Arc::new(Notify::new()), json!({})));
    let monitor = builder(&feed, &fetcher).autoconnect(false).spawn();
    let app = app::router(monitor);

    let (_, body) = call(&app, Method::POST, "/api/vitals/connect").await;
    assert_eq!(body["status"]["state"], "connecting");
    assert_eq!(feed.opens(), 1);

    let (_, body) = call(&app, Method::POST, "/api/vitals/disconnect").await;
    assert_eq!(body["status"]["state"], "disconnected");
    assert_eq!(feed.closes(), vec![1000]);

    let (_, body) = call(&app, Method::POST, "/api/vitals/poll").await;
    assert_eq!(body["status"]["state"], "connecting");
}
