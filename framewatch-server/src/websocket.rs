// WebSocket detection endpoint

use crate::error::ServerError;
use crate::http::AppState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::borrow::Cow;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_UNSUPPORTED: u16 = 1003;
const CLOSE_INTERNAL: u16 = 1011;

/// WebSocket upgrade handler for `/ws/detect`
pub async fn detect_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one detection session
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!("Detection session opened: {}", connection_id);
    state.metrics.connection_opened();

    let outcome = detection_loop(&mut socket, &state, &connection_id).await;

    let close = match &outcome {
        Ok(()) => close_frame(CLOSE_NORMAL, "bye"),
        Err(ServerError::Protocol(reason)) => {
            warn!("Protocol error on {}: {}", connection_id, reason);
            close_frame(CLOSE_UNSUPPORTED, "binary frames only")
        }
        Err(ServerError::Transport(e)) => {
            debug!("Transport error on {}: {}", connection_id, e);
            None
        }
        Err(e) => {
            error!("Detection failed on {}: {}", connection_id, e);
            close_frame(CLOSE_INTERNAL, "processing error")
        }
    };

    if let Some(frame) = close {
        // Peer may already be gone
        let _ = socket.send(Message::Close(Some(frame))).await;
    }

    state.metrics.connection_closed();
    info!("Detection session closed: {}", connection_id);
}

fn close_frame(code: u16, reason: &'static str) -> Option<CloseFrame<'static>> {
    Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    })
}

/// Receive frames until the peer closes or something fails.
/// Frames are handled strictly in arrival order, one reply per frame.
async fn detection_loop(
    socket: &mut WebSocket,
    state: &AppState,
    connection_id: &str,
) -> Result<(), ServerError> {
    while let Some(message) = socket.recv().await {
        match message? {
            Message::Binary(frame) => {
                let payload = run_detection(state, frame).await?;
                socket.send(Message::Text(payload)).await?;
            }
            Message::Text(_) => {
                return Err(ServerError::Protocol(
                    "text message received on a binary-only endpoint".to_string(),
                ));
            }
            Message::Close(_) => {
                debug!("Peer closed session {}", connection_id);
                return Ok(());
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    Ok(())
}

/// Run one frame through the pipeline on the worker pool and encode the reply
async fn run_detection(state: &AppState, frame: Vec<u8>) -> Result<String, ServerError> {
    let pipeline = state.pipeline.clone();

    let report = match state.executor.run(move || pipeline.analyze(&frame)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            state.metrics.record_inference_error();
            return Err(e.into());
        }
        Err(e) => {
            state.metrics.record_inference_error();
            return Err(e.into());
        }
    };

    state.metrics.record_frame(&report);
    debug!(
        "Frame processed in {:?}: {} raw, {} sent",
        report.inference_time,
        report.raw_detections,
        report.response.len()
    );

    Ok(report.response.to_json()?)
}
