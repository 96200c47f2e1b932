//! Shared test harness: boots the server on a random port against a temp
//! data directory, with the primary admin seeded.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const ADMIN_EMAIL: &str = "admin@glory.com";
pub const ADMIN_PASSWORD: &str = "glory2025";

pub type WsRead = futures_util::stream::SplitStream<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
>;
pub type WsWrite = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Start the server on a random port and return (base_url, addr).
pub async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = glory_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = glory_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");
    glory_server::auth::accounts::seed_admin(&db, ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("Failed to seed admin");

    let uploads_dir = tmp_dir.path().join("uploads");
    std::fs::create_dir_all(&uploads_dir).expect("Failed to create uploads dir");

    let connections = glory_server::ws::new_connection_registry();
    let state = glory_server::state::AppState {
        db,
        jwt_secret,
        live: glory_server::live::LiveState::new(connections.clone()),
        connections,
        rooms: glory_server::ws::new_room_registry(),
        uploads_dir,
    };

    let app = glory_server::routes::build_router(state, 20 * 1024 * 1024);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    let base_url = format!("http://{}", addr);
    (base_url, addr)
}

/// Sign up a member account and return its token.
pub async fn signup(base_url: &str, name: &str, email: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/signup", base_url))
        .json(&json!({
            "name": name,
            "email": email,
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Signup failed for {}", email);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Log in as the seeded primary admin and return the token.
pub async fn admin_token(base_url: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Admin login failed");
    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Open a WebSocket connection. The server's first frame carries the
/// assigned connection id; it is consumed and returned.
pub async fn connect_ws(addr: SocketAddr, token: &str) -> (WsWrite, WsRead, String) {
    let ws_url = format!("ws://{}/ws?token={}", addr, token);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    let (write, mut read) = ws_stream.split();

    let connected = wait_for_event(&mut read, "connected").await;
    let conn_id = connected["connId"].as_str().unwrap().to_string();
    (write, read, conn_id)
}

/// Drain frames until an event with the given name arrives, returning its
/// data payload. Panics after two seconds without a match.
pub async fn wait_for_event(read: &mut WsRead, event: &str) -> serde_json::Value {
    let deadline = Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout(deadline, read.next())
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for event '{}'", event));
        match frame {
            Some(Ok(Message::Text(text))) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if value["event"] == event {
                    return value["data"].clone();
                }
            }
            Some(Ok(_)) => continue,
            other => panic!("Stream ended waiting for '{}': {:?}", event, other),
        }
    }
}

/// Assert that no event with the given name arrives within the window.
pub async fn assert_no_event(read: &mut WsRead, event: &str, window: Duration) {
    let result = tokio::time::timeout(window, async {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                    if value["event"] == event {
                        return value;
                    }
                }
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(result.is_err(), "Unexpected '{}' event: {:?}", event, result);
}

/// Send a client event frame.
pub async fn send_event(write: &mut WsWrite, event: &str, data: serde_json::Value) {
    use futures_util::SinkExt;
    let frame = json!({ "event": event, "data": data }).to_string();
    write.send(Message::Text(frame.into())).await.unwrap();
}
