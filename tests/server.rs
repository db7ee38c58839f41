//! End-to-end: serve a composed engine over TCP and shut it down.

use std::time::Duration;

use gateway_engine::http::fallback::PRODUCT_HEADER_NAME;
use gateway_engine::observability::{Telemetry, TRACE_SERVICE_NAME};
use gateway_engine::{EngineOptions, GatewayEngineFactory, GatewayServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;

mod common;

#[tokio::test]
async fn test_serve_and_graceful_shutdown() {
    let telemetry = Telemetry::start(TRACE_SERVICE_NAME);
    let options = EngineOptions::new(telemetry.handle());
    let config = common::service_config(common::extra(
        common::ROUTER_NS,
        json!({ "error_body": { "404": { "error": "not found" } } }),
    ));

    let server = GatewayServer::new(&GatewayEngineFactory::new(), config, options).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    let client = reqwest::Client::new();

    let status = client
        .get(format!("http://{addr}/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(status.status(), 200);
    assert!(status.headers().contains_key("x-request-id"));
    assert_eq!(status.json::<Value>().await.unwrap(), json!({ "status": "ok" }));

    let missing = client
        .get(format!("http://{addr}/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    assert!(missing.headers().contains_key(PRODUCT_HEADER_NAME));
    assert_eq!(
        missing.json::<Value>().await.unwrap(),
        json!({ "error": "not found" })
    );

    assert_eq!(shutdown.trigger(), 1);
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());

    let telemetry_handle = telemetry.handle();
    drop(telemetry);
    assert!(!telemetry_handle.is_active());
}
