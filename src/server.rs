use std::io;
use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, get_service, post},
    Extension, Json, Router,
};
use serde_json::json;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    config::Config,
    error::Error,
    gateway::CommandGateway,
    hub::{self, BroadcastHub},
    link::channel::LinkChannel,
    protocol::CommandRequest,
    websocket,
};

/// The default port to run the server on.
pub const DEFAULT_PORT: u16 = 3000;

async fn run(
    config: Config,
    port: Option<u16>,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error> {
    config.validate()?;

    let hub = BroadcastHub::new(hub::DEFAULT_CAPACITY);

    // Opening the link is fatal on failure; without it the server
    // has nothing to bridge.
    let link = LinkChannel::open(&config, hub.clone())?;
    let gateway = CommandGateway::new(link);

    serve(config, hub, gateway, port, allocated_port).await
}

/// Run the server around an already-attached link.
///
/// [`run_on_port`]/[`run_any_port`] use this after opening the serial
/// device; tests use it directly with a link pumping an in-memory
/// transport.
pub async fn serve(
    config: Config,
    hub: BroadcastHub,
    gateway: CommandGateway,
    port: Option<u16>,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error> {
    let app = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/command", post(submit_command))
        .route("/config", get(show_config))
        .route("/version", get(show_version));

    // The browser UI, when one is configured.
    let app = match &config.static_dir {
        Some(static_dir) => {
            app.fallback(get_service(ServeDir::new(static_dir)).handle_error(static_file_error))
        }
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            // Each websocket subscribes through the hub
            .layer(Extension(hub))
            // The command route writes through the gateway
            .layer(Extension(gateway))
            // The bridge config should be known to the web server
            .layer(Extension(config)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(0)));
    let server =
        axum::Server::bind(&addr).serve(app.into_make_service_with_connect_info::<SocketAddr>());
    let addr = server.local_addr();

    if let Some(port_reply) = allocated_port {
        port_reply
            .send(addr.port())
            .expect("The receiver of which port was allocated should not be dropped");
    }

    info!("listening on {}", addr);

    server.await.expect("Server should not stop");

    Ok(())
}

/// Start the server on an arbitrary available port.
/// The port allocated will be sent on the provided channel.
pub async fn run_any_port(config: Config, allocated_port: oneshot::Sender<u16>) -> Result<(), Error> {
    run(config, None, Some(allocated_port)).await
}

/// Start the server on the given port.
pub async fn run_on_port(config: Config, port: u16) -> Result<(), Error> {
    run(config, Some(port), None).await
}

async fn submit_command(
    Extension(gateway): Extension<CommandGateway>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    match gateway.submit(request.into_payload()).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e @ Error::MissingPayload) => {
            (StatusCode::BAD_REQUEST, error_body(&e)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(&e)).into_response(),
    }
}

fn error_body(error: &Error) -> Json<serde_json::Value> {
    Json(json!({ "message": error.to_string() }))
}

async fn show_config(Extension(config): Extension<Config>) -> impl IntoResponse {
    config.serialize_pretty()
}

async fn show_version() -> impl IntoResponse {
    format!("Serial Bridge v{}\n", env!("CARGO_PKG_VERSION"))
}

async fn static_file_error(error: io::Error) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Could not serve file: {error}"),
    )
}
