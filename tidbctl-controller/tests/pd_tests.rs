//! PD client and provider tests against an in-process PD API

mod common;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::serve;
use serde_json::json;
use tidbctl_common::{ClusterDescriptor, Namespace};
use tidbctl_controller::config::PdConfig;
use tidbctl_controller::pd::client::{HttpPdClient, PdClient};
use tidbctl_controller::pd::error::PdError;
use tidbctl_controller::{get_pd_client, DefaultPdControl, PdControl};

fn pd_router() -> Router {
    Router::new()
        .route(
            "/pd/api/v1/health",
            get(|| async {
                Json(json!([
                    {"name": "c1-pd-0", "member_id": 11, "client_urls": ["http://c1-pd-0:2379"], "health": true},
                    {"name": "c1-pd-1", "member_id": 12, "client_urls": ["http://c1-pd-1:2379"], "health": false}
                ]))
            }),
        )
        .route(
            "/pd/api/v1/members",
            get(|| async {
                Json(json!({
                    "header": {"cluster_id": 1},
                    "members": [
                        {"name": "c1-pd-0", "member_id": 11, "peer_urls": ["http://c1-pd-0:2380"], "client_urls": ["http://c1-pd-0:2379"]}
                    ],
                    "leader": {"name": "c1-pd-0", "member_id": 11},
                    "etcd_leader": {"name": "c1-pd-0", "member_id": 11}
                }))
            }),
        )
}

#[tokio::test]
async fn test_http_client_get_health() {
    let (addr, _server) = serve(pd_router()).await;
    let client = HttpPdClient::new(format!("http://{}", addr), reqwest::Client::new());

    let health = client.get_health().await.unwrap();

    assert_eq!(health.healths.len(), 2);
    assert_eq!(health.healths[0].member_id, 11);
    assert!(!health.all_healthy());
}

#[tokio::test]
async fn test_http_client_get_members() {
    let (addr, _server) = serve(pd_router()).await;
    let client = HttpPdClient::new(format!("http://{}", addr), reqwest::Client::new());

    let members = client.get_members().await.unwrap();

    assert_eq!(members.members.len(), 1);
    assert_eq!(members.members[0].peer_urls, vec!["http://c1-pd-0:2380"]);
    assert_eq!(members.leader.map(|l| l.name), Some("c1-pd-0".to_string()));
}

#[tokio::test]
async fn test_http_client_error_status() {
    let router = Router::new().route(
        "/pd/api/v1/members",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "etcd unavailable") }),
    );
    let (addr, _server) = serve(router).await;
    let client = HttpPdClient::new(format!("http://{}", addr), reqwest::Client::new());

    match client.get_members().await {
        Err(PdError::Status { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "etcd unavailable");
        }
        other => panic!("expected status error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_http_client_bad_body() {
    let router = Router::new().route("/pd/api/v1/health", get(|| async { "not json" }));
    let (addr, _server) = serve(router).await;
    let client = HttpPdClient::new(format!("http://{}", addr), reqwest::Client::new());

    assert!(matches!(
        client.get_health().await,
        Err(PdError::Decode { .. })
    ));
}

#[tokio::test]
async fn test_default_control_resolves_cluster_service() {
    let (addr, _server) = serve(pd_router()).await;

    let http = reqwest::Client::builder()
        .resolve("c1-pd.ns1", addr)
        .build()
        .unwrap();
    let config = PdConfig {
        port: addr.port(),
        ..Default::default()
    };
    let control = DefaultPdControl::with_http_client(config, http);

    let tc = ClusterDescriptor::new("ns1", "c1");
    let client = get_pd_client(&control, &tc).await.unwrap();
    assert_eq!(client.url(), format!("http://c1-pd.ns1:{}", addr.port()));

    let health = client.get_health().await.unwrap();
    assert_eq!(health.healths.len(), 2);

    // Second lookup is served from the cache.
    let again = control
        .get_pd_client(&Namespace::from("ns1"), "c1")
        .await
        .unwrap();
    assert_eq!(again.url(), client.url());
    assert_eq!(control.cached_clients().await, 1);
}
