//! Runs the real WebSocket connector and HTTP fallback client against a local
//! axum server speaking the agent protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use salesline_core::chat::SessionController;
use salesline_core::storage::memory::MemoryKvStore;
use salesline_core::transport::{FallbackClient, StreamConnector};
use salesline_infra::transport::{HttpFallbackClient, WsConnector};
use salesline_types::config::{ClientConfig, ReconnectConfig};
use salesline_types::connection::{ConnectionState, DeliveryPath};
use salesline_types::error::TransportError;
use salesline_types::protocol::FallbackRequest;
use salesline_types::visitor::VisitorId;

#[derive(Deserialize)]
struct ChatBody {
    #[allow(dead_code)]
    visitor_id: String,
    message: String,
}

async fn ws_chat(Path(_visitor_id): Path<String>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(agent_socket)
}

async fn agent_socket(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let body: serde_json::Value = serde_json::from_str(text.as_str()).unwrap_or_default();
        let user_text = body["message"].as_str().unwrap_or_default().trim().to_string();

        let frames = if user_text.is_empty() {
            vec![json!({"type": "error", "error": "Empty message"})]
        } else {
            vec![
                json!({"type": "token", "data": "I can"}),
                json!({"type": "token", "data": " help"}),
                json!({"type": "done", "data": "I can help"}),
                json!({"type": "tool", "data": {"name": "save_lead"}}),
                json!({"type": "round_complete"}),
            ]
        };
        for frame in frames {
            if socket
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                return;
            }
        }
    }
}

async fn fallback_chat(Json(body): Json<ChatBody>) -> impl IntoResponse {
    if body.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Empty message"})));
    }
    (
        StatusCode::OK,
        Json(json!({"message": "I can help", "tools": [{"name": "save_lead"}]})),
    )
}

async fn broken_chat() -> impl IntoResponse {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "ts": "2026-01-01T00:00:00Z"}))
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/ws/chat/{visitor_id}", get(ws_chat))
        .route("/api/v1/chat", post(fallback_chat))
        .route("/api/v1/broken", post(broken_chat))
        .route("/health", get(health));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        server_url: format!("http://{addr}"),
        request_timeout_secs: 5,
        reconnect: ReconnectConfig {
            max_attempts: 0,
            ..ReconnectConfig::default()
        },
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn ws_connector_streams_frames() {
    let addr = spawn_server().await;
    let connector = WsConnector::new(config_for(addr));

    let mut channel = connector.connect(&VisitorId::generate()).await.unwrap();
    channel
        .outbound
        .send(r#"{"message":"I need a mobile app"}"#.to_string())
        .await
        .unwrap();

    let mut frames = Vec::new();
    while frames.len() < 5 {
        let frame = tokio::time::timeout(Duration::from_secs(5), channel.inbound.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        frames.push(frame);
    }
    assert!(frames[0].contains(r#""type":"token""#));
    assert!(frames[4].contains("round_complete"));
}

#[tokio::test]
async fn ws_connector_reports_unreachable_server() {
    let addr = spawn_server().await;
    let config = ClientConfig {
        stream_path: "/no/such/route".to_string(),
        ..config_for(addr)
    };

    let err = WsConnector::new(config)
        .connect(&VisitorId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)));
}

#[tokio::test]
async fn http_client_sends_and_checks_health() {
    let addr = spawn_server().await;
    let client = HttpFallbackClient::new(&config_for(addr)).unwrap();

    let reply = client
        .send(&FallbackRequest {
            visitor_id: VisitorId::generate(),
            message: "I need a mobile app".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply.message, "I can help");
    assert_eq!(reply.tools.len(), 1);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn http_client_maps_error_status() {
    let addr = spawn_server().await;
    let config = ClientConfig {
        fallback_path: "/api/v1/broken".to_string(),
        ..config_for(addr)
    };
    let client = HttpFallbackClient::new(&config).unwrap();

    let err = client
        .send(&FallbackRequest {
            visitor_id: VisitorId::generate(),
            message: "hello".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status(500)));
}

async fn run_exchange(config: ClientConfig) -> (Vec<String>, DeliveryPath) {
    let mut session = SessionController::start(
        Arc::new(MemoryKvStore::new()),
        Arc::new(WsConnector::new(config.clone())),
        Arc::new(HttpFallbackClient::new(&config).unwrap()),
        &config,
    )
    .await;

    while session.connection_state() == ConnectionState::Connecting {
        assert!(session.next_event().await);
    }

    let path = session.send_message("I need a mobile app").await.unwrap();
    while session.messages().len() < 3 || session.is_typing() {
        let progressed = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .unwrap();
        assert!(progressed);
    }
    let texts = session.messages().iter().map(|m| m.text.clone()).collect();
    session.close().await;
    (texts, path)
}

#[tokio::test]
async fn session_over_stream_and_fallback_reach_same_conversation() {
    let addr = spawn_server().await;

    let (streamed, path) = run_exchange(config_for(addr)).await;
    assert_eq!(path, DeliveryPath::Stream);

    let no_stream = ClientConfig {
        stream_path: "/no/such/route".to_string(),
        ..config_for(addr)
    };
    let (fallback, path) = run_exchange(no_stream).await;
    assert_eq!(path, DeliveryPath::Fallback);

    assert_eq!(streamed, fallback);
    assert_eq!(streamed[1], "I need a mobile app");
    assert_eq!(streamed[2], "I can help");
}
