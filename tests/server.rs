//! HTTP API tests against a server bound to a free local port.

mod common;

use common::{as_refs, harness, service_files, Harness};
use repo_indexer::indexer::Pipeline;
use repo_indexer::server::router;
use serde_json::Value;
use std::time::Duration;

async fn spawn_server(pipeline: Pipeline) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(pipeline)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn wait_for_status(client: &reqwest::Client, base: &str, id: &str, status: &str) -> Value {
    let url = format!("{}/connections/{}", base, id);
    for _ in 0..50 {
        let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
        if body["status"] == status {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("connection {} never reached status {}", id, status);
}

async fn indexed_server() -> (Harness, String, reqwest::Client) {
    let mut files = service_files(2);
    files.push((
        "src/components/Nav.tsx".to_string(),
        "export function Nav() {}\n".to_string(),
    ));
    let h = harness(&as_refs(&files)).await;
    let base = spawn_server(h.pipeline.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/connections/{}/index", base, h.connection.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["run"], "index");

    wait_for_status(&client, &base, &h.connection.id, "ready").await;
    (h, base, client)
}

#[tokio::test]
async fn health_reports_version() {
    let h = harness(&[]).await;
    let base = spawn_server(h.pipeline.clone()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_connection_is_404_with_error_body() {
    let h = harness(&[]).await;
    let base = spawn_server(h.pipeline.clone()).await;

    let resp = reqwest::get(format!("{}/connections/missing", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = reqwest::Client::new()
        .post(format!("{}/connections/missing/resync", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn index_runs_in_background_and_modules_are_queryable() {
    let (h, base, client) = indexed_server().await;

    let connection = wait_for_status(&client, &base, &h.connection.id, "ready").await;
    assert_eq!(connection["module_count"], 3);
    assert_eq!(connection["file_count"], 3);

    let url = format!("{}/connections/{}/modules", base, h.connection.id);
    let all: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let modules = all["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);
    assert!(modules[0].get("raw_content").is_none());
    assert!(modules[0].get("embedding").is_none());

    let services: Value = client
        .get(&url)
        .query(&[("module_type", "service")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(services["modules"].as_array().unwrap().len(), 2);

    let nav: Value = client
        .get(&url)
        .query(&[("q", "Nav")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let nav = nav["modules"].as_array().unwrap();
    assert_eq!(nav.len(), 1);
    assert_eq!(nav[0]["file_path"], "src/components/Nav.tsx");
    assert_eq!(nav[0]["module_type"], "component");

    let limited: Value = client
        .get(&url)
        .query(&[("limit", "1")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited["modules"].as_array().unwrap().len(), 1);

    let bad = client
        .get(&url)
        .query(&[("module_type", "widget")])
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);
}

#[tokio::test]
async fn architecture_endpoint_serves_the_workspace_summary() {
    let (_h, base, client) = indexed_server().await;

    let body: Value = client
        .get(format!("{}/workspaces/ws1/architecture", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["content"], common::OVERVIEW);
    assert_eq!(body["workspace_id"], "ws1");

    let missing = client
        .get(format!("{}/workspaces/other/architecture", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn starting_a_run_on_a_syncing_connection_conflicts() {
    let files = service_files(1);
    let h = harness(&as_refs(&files)).await;
    assert!(h.store.try_begin_sync(&h.connection.id, false).await.unwrap());
    let base = spawn_server(h.pipeline.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/connections/{}/resync", base, h.connection.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "already_syncing");

    let forced = client
        .post(format!("{}/connections/{}/index?force=true", base, h.connection.id))
        .send()
        .await
        .unwrap();
    assert_eq!(forced.status(), 202);
    wait_for_status(&client, &base, &h.connection.id, "ready").await;
}
