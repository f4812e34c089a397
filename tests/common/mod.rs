#![allow(dead_code)]

use std::time::Duration;

use axum::http::StatusCode;
use color_eyre::Result;
use futures::StreamExt;
use serial_bridge::{
    config::Config,
    gateway::CommandGateway,
    hub::BroadcastHub,
    link::{channel::LinkChannel, codec::LineCodec},
    protocol::Event,
    server,
};
use tokio::io::DuplexStream;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server whose link pumps an in-memory transport instead of
/// a serial device.
///
/// The returned stream is the device side: write to it to emit
/// telemetry, read from it to observe submitted command payloads.
pub async fn start_server() -> (u16, DuplexStream) {
    let (device, host) = tokio::io::duplex(4096);

    let hub = BroadcastHub::default();
    let link = LinkChannel::from_stream(host, LineCodec::default(), "duplex", hub.clone());
    let gateway = CommandGateway::new(link);

    let (port_tx, port_rx) = oneshot::channel();

    tokio::spawn(async move {
        server::serve(Config::default(), hub, gateway, None, Some(port_tx)).await
    });

    let port = port_rx
        .await
        .expect("Server should reply with allocated port");

    (port, device)
}

pub async fn connect(port: u16) -> Result<Client> {
    info!("Connecting to server on port {port}");
    let (stream, http_response) =
        tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws")).await?;

    assert_eq!(http_response.status(), StatusCode::SWITCHING_PROTOCOLS);

    // The subscription is made just after the upgrade reply; give the
    // server a moment so records published next are not missed.
    tokio::time::sleep(Duration::from_millis(250)).await;

    Ok(stream)
}

pub async fn receive_event(client: &mut Client) -> Result<Event> {
    let message = timeout(Duration::from_secs(5), client.next())
        .await?
        .ok_or_else(|| color_eyre::eyre::eyre!("Stream closed"))??;

    let message = message.to_text()?;
    let event = serde_json::from_str(message)?;

    Ok(event)
}

pub async fn post_command(port: u16, body: &str) -> Result<StatusCode> {
    let client = hyper::Client::new();

    let request = hyper::Request::builder()
        .method(hyper::Method::POST)
        .uri(format!("http://127.0.0.1:{port}/command"))
        .header("content-type", "application/json")
        .body(hyper::Body::from(body.to_string()))?;

    let response = client.request(request).await?;

    Ok(response.status())
}

pub async fn get(port: u16, path: &str) -> Result<(StatusCode, String)> {
    let client = hyper::Client::new();

    let response = client
        .get(format!("http://127.0.0.1:{port}{path}").parse()?)
        .await?;

    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body()).await?;
    let body = String::from_utf8(body.to_vec())?;

    Ok((status, body))
}
