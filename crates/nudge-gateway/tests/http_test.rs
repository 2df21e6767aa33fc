use std::net::TcpListener;

use nudge_config::AppConfig;
use nudge_gateway::GatewayServer;

/// Pick a random available port.
fn random_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to random port");
    listener.local_addr().unwrap().port()
}

fn test_config(data_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.gateway.port = random_port();
    config.data_dir = Some(data_dir.to_path_buf());
    config.slack.notify_enabled = false;
    config
}

/// Start the gateway in the background and return the HTTP base URL.
async fn start_test_gateway(config: AppConfig) -> String {
    let port = config.gateway.port;
    tokio::spawn(async move {
        let server = GatewayServer::new(config);
        let _ = server.run().await;
    });

    // Wait for the server to be ready
    for _ in 0..50 {
        if TcpListener::bind(format!("127.0.0.1:{port}")).is_err() {
            break; // port is in use = server is up
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn health_endpoint_responds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(test_config(dir.path())).await;

    let body = reqwest::get(format!("{base}/health"))
        .await
        .expect("request should succeed")
        .text()
        .await
        .expect("body should read");
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn home_serves_chat_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(test_config(dir.path())).await;

    let resp = reqwest::get(format!("{base}/")).await.expect("request");
    assert!(resp.status().is_success());
    let body = resp.text().await.expect("body");
    assert!(body.contains("Nudge"));
    assert!(body.contains("Debug panel"));
}

#[tokio::test]
async fn cron_rejects_missing_or_wrong_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.gateway.cron_token = Some("secret-token".to_string());
    let base = start_test_gateway(config).await;

    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/cron/archive_overdue"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{base}/cron/archive_overdue"))
        .header("x-cron-token", "wrong")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn cron_archives_with_correct_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.gateway.cron_token = Some("secret-token".to_string());
    let base = start_test_gateway(config).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/cron/archive_overdue"))
        .header("x-cron-token", "secret-token")
        .send()
        .await
        .expect("request");
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["success"], true);
    assert_eq!(body["archived"], 0);
}

#[tokio::test]
async fn notifications_endpoint_returns_empty_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(test_config(dir.path())).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/notifications?user_id=u1"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["success"], true);
    assert_eq!(body["notifications"], serde_json::json!([]));
}

#[tokio::test]
async fn slack_events_rejects_unsigned_requests() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = start_test_gateway(test_config(dir.path())).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/slack/events"))
        .json(&serde_json::json!({ "type": "url_verification", "challenge": "c" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn slack_url_verification_echoes_challenge_when_signed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.slack.signing_secret = Some("test-signing-secret".to_string());
    let base = start_test_gateway(config).await;

    let body = serde_json::json!({ "type": "url_verification", "challenge": "nudge-check" })
        .to_string();
    let timestamp = "1531420618";
    let signature =
        nudge_channels::slack::signature::sign("test-signing-secret", timestamp, body.as_bytes());

    let resp = reqwest::Client::new()
        .post(format!("{base}/slack/events"))
        .header("x-slack-request-timestamp", timestamp)
        .header("x-slack-signature", signature)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("request");
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["challenge"], "nudge-check");
}
