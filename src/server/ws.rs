//! The download channel: a WebSocket that accepts commands and streams
//! progress events back.
//!
//! # Overview
//!
//! Each connection gets one writer task fed by a bounded queue, so events
//! for a session are delivered in order and a slow client applies
//! backpressure instead of interleaving writes. Commands are handled one at
//! a time per connection; a second command is read only after the previous
//! session has finished.
//!
//! Recoverable rejections (rate limit, bad URL) keep the connection open;
//! unreadable frames end it after a final error event.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::session::{BEST_FORMAT, DownloadSession, EventSender, ProgressEvent};

use super::AppState;

/// Depth of the per-connection outbound event queue.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Command received from a client on the download channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientCommand {
    /// Start a download.
    Download {
        url: String,
        #[serde(default = "default_format_id")]
        format_id: String,
    },
}

fn default_format_id() -> String {
    BEST_FORMAT.to_string()
}

/// Upgrades the request and hands the socket to the connection loop.
pub(super) async fn ws_download(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, addr, state))
}

#[instrument(skip(socket, state), fields(client = %addr.ip()))]
async fn handle_connection(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (events, outbound) = EventSender::channel(OUTBOUND_QUEUE_DEPTH);
    let writer = tokio::spawn(write_events(sink, outbound));

    let client_key = addr.ip().to_string();
    let session = DownloadSession::new(
        Arc::clone(&state.extractor),
        Arc::clone(&state.catalog),
        Arc::clone(&state.gate),
        state.config.max_file_size,
    );

    while let Some(received) = stream.next().await {
        let message = match received {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "connection failed");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                // Every inbound message spends rate budget, well-formed
                // or not.
                if !state.limiter.admit(&client_key) {
                    events
                        .send(ProgressEvent::error(
                            "Too many requests, please try again later",
                        ))
                        .await;
                    continue;
                }

                let command: ClientCommand = match serde_json::from_str(text.as_str()) {
                    Ok(command) => command,
                    Err(err) => {
                        debug!(error = %err, "unreadable command, closing");
                        events.send(ProgressEvent::error(err.to_string())).await;
                        break;
                    }
                };

                let ClientCommand::Download { url, format_id } = command;
                if !state.validator.is_valid(&url) {
                    events.send(ProgressEvent::error("Invalid URL")).await;
                    continue;
                }

                session.run(&url, &format_id, &events).await;
            }
            Message::Binary(_) => {
                events
                    .send(ProgressEvent::error("binary frames are not supported"))
                    .await;
                break;
            }
            Message::Close(_) => {
                debug!("client closed the connection");
                break;
            }
            // Pings are answered at the protocol level.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Dropping the sender lets the writer drain the queue and close.
    drop(events);
    if let Err(err) = writer.await {
        warn!(error = %err, "event writer task failed");
    }
}

/// Serializes queued events onto the socket until the queue or client ends.
async fn write_events(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ProgressEvent>,
) {
    while let Some(event) = outbound.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize event");
                continue;
            }
        };

        if sink.send(Message::Text(json.into())).await.is_err() {
            debug!("client gone, stopping event writer");
            break;
        }
    }

    let _ = sink.close().await;
}
