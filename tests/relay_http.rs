//! Integration tests for the HTTP surface: SSE streaming, publishing, CORS.

use std::sync::Arc;
use std::time::Duration;

use notify_relay::session::{EventDecoder, EventPayload};
use notify_relay::{RelayServer, ServerConfig, StaticDirectory, UserId};
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Helper: start the relay on a random port and return (base_url, server).
async fn start_test_server(config: ServerConfig) -> (String, Arc<RelayServer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(RelayServer::new(
        config,
        Arc::new(StaticDirectory::builtin()),
    ));
    let running = Arc::clone(&server);
    tokio::spawn(async move {
        running
            .serve(listener, std::future::pending())
            .await
            .unwrap();
    });

    (format!("http://{}", addr), server)
}

fn test_config() -> ServerConfig {
    ServerConfig::default().keep_alive(Duration::from_millis(50))
}

/// Read from an SSE response until one event arrives, returning it and the raw bytes seen.
async fn next_event(
    response: &mut reqwest::Response,
    decoder: &mut EventDecoder,
) -> (EventPayload, Vec<u8>) {
    timeout(WAIT, async {
        let mut raw = Vec::new();
        loop {
            let chunk = response
                .chunk()
                .await
                .expect("stream error")
                .expect("stream ended before an event arrived");
            raw.extend_from_slice(&chunk);
            if let Some(event) = decoder.push(&chunk).into_iter().next() {
                return (event, raw);
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll until `condition` holds or the wait budget runs out.
async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn post_message(
    client: &reqwest::Client,
    base: &str,
    project: &str,
    message: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/post?projectid={}", base, project))
        .form(&[("message", message)])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_publish_and_disconnect() {
    let (base, server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let mut stream = client
        .get(format!("{}/events?id=1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), 200);
    assert_eq!(
        stream.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(stream.headers()["cache-control"].to_str().unwrap(), "no-cache");
    assert!(server.registry().is_connected(UserId(1)));

    let response = post_message(&client, &base, "1", "hello").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());

    let mut decoder = EventDecoder::new();
    let (event, raw) = next_event(&mut stream, &mut decoder).await;
    assert_eq!(event.data, "hello");
    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.contains("data: {\"data\":\"hello\"} \n\n"));

    // Client disconnects; the keep-alive write notices and the session cleans up
    drop(stream);
    let registry = Arc::clone(server.registry());
    eventually(|| !registry.is_connected(UserId(1))).await;

    let response = post_message(&client, &base, "1", "after").await;
    assert_eq!(response.status(), 200);

    let stats = server.stats().snapshot(server.registry().len());
    assert_eq!(stats.messages_published, 2);
    assert_eq!(stats.deliveries, 1);
    assert_eq!(stats.offline_skips, 3);
    assert_eq!(stats.streams_opened, 1);
    assert_eq!(stats.streams_closed, 1);
}

#[tokio::test]
async fn test_only_project_subscribers_receive() {
    let (base, _server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let mut subscriber = client
        .get(format!("{}/events?id=3", base))
        .send()
        .await
        .unwrap();
    let mut outsider = client
        .get(format!("{}/events?id=1", base))
        .send()
        .await
        .unwrap();

    post_message(&client, &base, "2", "drift").await;
    post_message(&client, &base, "1", "fast").await;

    let mut decoder = EventDecoder::new();
    let (event, _) = next_event(&mut subscriber, &mut decoder).await;
    assert_eq!(event.data, "drift");

    // User 1 is subscribed to project 1 only, so its first event is "fast"
    let mut decoder = EventDecoder::new();
    let (event, _) = next_event(&mut outsider, &mut decoder).await;
    assert_eq!(event.data, "fast");
}

#[tokio::test]
async fn test_reconnect_replaces_previous_stream() {
    let (base, server) = start_test_server(ServerConfig::default().disable_keep_alive()).await;
    let client = reqwest::Client::new();

    let mut first = client
        .get(format!("{}/events?id=4", base))
        .send()
        .await
        .unwrap();
    let mut second = client
        .get(format!("{}/events?id=4", base))
        .send()
        .await
        .unwrap();

    // The first stream's conduit was replaced, so its body ends
    let ended = timeout(WAIT, async {
        while first.chunk().await.unwrap().is_some() {}
    })
    .await;
    assert!(ended.is_ok());
    assert!(server.registry().is_connected(UserId(4)));

    post_message(&client, &base, "2", "latest").await;
    let mut decoder = EventDecoder::new();
    let (event, _) = next_event(&mut second, &mut decoder).await;
    assert_eq!(event.data, "latest");
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test]
async fn test_malformed_project_id_is_client_error() {
    let (base, _server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = post_message(&client, &base, "abc", "x").await;
    assert_eq!(response.status(), 400);
    assert!(!response.text().await.unwrap().is_empty());

    let response = client
        .post(format!("{}/post", base))
        .form(&[("message", "x")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_unknown_project_is_accepted() {
    let (base, server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = post_message(&client, &base, "42", "nobody").await;
    assert_eq!(response.status(), 200);

    let stats = server.stats().snapshot(0);
    assert_eq!(stats.unknown_projects, 1);
    assert_eq!(stats.messages_published, 0);
}

#[tokio::test]
async fn test_invalid_user_id_is_client_error() {
    let (base, server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/events", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .get(format!("{}/events?id=alice", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_cors_and_preflight() {
    let (base, _server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("{}/post", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert!(response.text().await.unwrap().is_empty());

    let response = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_stats_endpoint() {
    let (base, _server) = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let _stream = client
        .get(format!("{}/events?id=2", base))
        .send()
        .await
        .unwrap();
    post_message(&client, &base, "1", "count me").await;

    let body = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let stats: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(stats["active_streams"], 1);
    assert_eq!(stats["messages_published"], 1);
    assert_eq!(stats["deliveries"], 1);
    assert_eq!(stats["offline_skips"], 1);
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let (base, server) = start_test_server(ServerConfig::default().disable_keep_alive()).await;
    let client = reqwest::Client::new();

    let mut stream = client
        .get(format!("{}/events?id=1", base))
        .send()
        .await
        .unwrap();
    assert!(server.registry().is_connected(UserId(1)));

    server.shutdown_token().cancel();

    let ended = timeout(WAIT, async {
        while let Ok(Some(_)) = stream.chunk().await {}
    })
    .await;
    assert!(ended.is_ok());
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_index_page() {
    let path = std::env::temp_dir().join(format!("notify-relay-index-{}.html", std::process::id()));
    std::fs::write(&path, "<html>relay</html>").unwrap();

    let (base, _server) = start_test_server(test_config().index_file(&path)).await;
    let response = reqwest::get(format!("{}/", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "<html>relay</html>");

    let (base, _server) = start_test_server(test_config()).await;
    let response = reqwest::get(format!("{}/", base)).await.unwrap();
    assert_eq!(response.status(), 404);

    let _ = std::fs::remove_file(&path);
}
