//! Lifecycle tests against a real loopback socket.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use trackpad_core::MouseButton;
use trackpad_server::application::{InputInjector, LogLevel};
use trackpad_server::domain::ServerConfig;
use trackpad_server::infrastructure::{InjectedCall, RecordingInjector, ServiceError, TrackpadService};

fn loopback_config() -> ServerConfig {
    ServerConfig {
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        ..ServerConfig::default()
    }
}

/// Sends one raw HTTP/1.1 request and returns the response text.
async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_port_in_use_reports_bind_error() {
    // Arrange: occupy a port first.
    let blocker = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let taken = blocker.local_addr().unwrap().port();
    let service = TrackpadService::new(loopback_config(), Arc::new(RecordingInjector::new()));

    // Act
    let result = service.start(taken).await;

    // Assert
    assert!(matches!(result, Err(ServiceError::Bind { .. })));
    let status = service.current_status();
    assert!(!status.running);
    assert!(status.last_error.is_some());
    assert!(service
        .log_snapshot()
        .iter()
        .any(|e| e.level == LogLevel::Error));
}

#[tokio::test]
async fn test_requests_over_tcp_reach_injector_before_stop_returns() {
    // Arrange
    let injector = Arc::new(RecordingInjector::new());
    let service = TrackpadService::new(loopback_config(), Arc::clone(&injector) as Arc<dyn InputInjector>);
    let addr = service.start(0).await.unwrap();

    // Act
    let body = r#"{"button":"right"}"#;
    let response = raw_request(
        addr,
        &format!(
            "POST /click HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    )
    .await;
    let status_during = service.current_status();
    service.stop().await;

    // Assert
    assert!(response.starts_with("HTTP/1.1 204"), "{response}");
    assert_eq!(status_during.clients_connected, 1);
    assert_eq!(injector.calls(), vec![InjectedCall::Click(MouseButton::Right)]);
}

#[tokio::test]
async fn test_status_route_over_tcp() {
    let service = TrackpadService::new(loopback_config(), Arc::new(RecordingInjector::new()));
    let addr = service.start(0).await.unwrap();

    let response = raw_request(
        addr,
        "GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    service.stop().await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""running":true"#));
    assert!(response.contains(r#""clientsConnected":0"#));
}
