use std::net::SocketAddr;

use futures::{sink::Sink, stream::Stream, SinkExt, StreamExt};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension, TypedHeader,
};

use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::{
    hub::{BroadcastHub, RecvError, Subscription},
    protocol::Event,
};

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(hub): Extension<BroadcastHub>,
) -> impl IntoResponse {
    if let Some(TypedHeader(user_agent)) = user_agent {
        info!("`{}`@`{addr}` connected", user_agent.as_str());
    }

    ws.on_upgrade(move |socket| {
        let span = info_span!("Subscriber", %addr);

        handle_subscriber(socket, addr, hub).instrument(span)
    })
}

pub(crate) async fn handle_subscriber(socket: WebSocket, addr: SocketAddr, hub: BroadcastHub) {
    let (stream_sender, stream_receiver) = socket.split();

    let subscription = hub.subscribe(&addr.to_string());

    let span = info_span!("Subscriber", %addr);

    let mut read_handle =
        tokio::spawn(read(stream_receiver).instrument(info_span!(parent: &span, "Read")));
    let mut write_handle = tokio::spawn(
        write(stream_sender, subscription).instrument(info_span!(parent: &span, "Write")),
    );
    drop(span);

    // Whichever half finishes first tears the other one down.
    // A client that goes away ends the read half; a lagging client is
    // disconnected by the write half. Either way the underlying TCP
    // connection gets closed, which signals the client the session is over.
    tokio::select! {
        _ = &mut read_handle => write_handle.abort(),
        _ = &mut write_handle => read_handle.abort(),
    }
}

/// The subscription is one-way: anything the client sends is drained
/// and ignored, we only care about noticing the disconnect.
pub(crate) async fn read<S>(mut receiver: S)
where
    S: Unpin,
    S: Stream<Item = Result<Message, axum::Error>>,
{
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                debug!(%text, "client sent text, ignoring");
            }
            Message::Binary(_) => {
                debug!("client sent binary data, ignoring");
            }
            Message::Ping(_) => {
                debug!("socket ping");
            }
            Message::Pong(_) => {
                debug!("socket pong");
            }
            Message::Close(_) => {
                debug!("client disconnected");
            }
        }
    }

    debug!("no more stuff");
}

pub(crate) async fn write(mut sender: impl Sink<Message> + Unpin, mut subscription: Subscription) {
    loop {
        match subscription.recv().await {
            Ok(record) => {
                let event = Event::from(record);
                let event = serde_json::to_string(&event).expect("Serialize should work");

                if sender.send(Message::Text(event)).await.is_err() {
                    debug!("client disconnected");
                    return;
                }
                trace!("Event flushed");
            }
            Err(RecvError::Lagged(missed)) => {
                // The bounded queue overflowed: this client is too slow.
                // Disconnect it rather than buffer without limit.
                warn!(%missed, "Subscriber lagging, disconnecting");
                return;
            }
            Err(RecvError::Closed) => {
                debug!("Hub gone, disconnecting");
                return;
            }
        }
    }
}
