//! Live voice WebSocket at `/ws/voice`.
//!
//! Each connection gets its own dialogue session, keyed `ws-{uuid}` and
//! evicted on disconnect. Text frames carry JSON commands; binary frames
//! carry raw PCM16 audio that is buffered, transcribed and run as a turn.
//! Frames are handled one at a time, so audio never interleaves with a turn
//! that is still in progress.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medibook_core::Location;
use medibook_dialogue::{pcm16_to_f32, ToolResult, VoiceBuffer};

use crate::state::AppState;

const WELCOME: &str = "Connected to voice agent";
const RESET_DONE: &str = "Conversation reset";
const NO_TRANSCRIBER: &str = "Speech transcription is not available";

/// Command sent by the client in a text frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Text {
        #[serde(default)]
        message: String,
        #[serde(default)]
        location: Option<Location>,
    },
    Reset,
}

/// Event pushed to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Status {
        message: String,
    },
    Transcript {
        text: String,
        is_final: bool,
    },
    Response {
        text: String,
        tool_result: Option<ToolResult>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    fn status(message: &str) -> Self {
        ServerMessage::Status {
            message: message.to_string(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_voice(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let key = format!("ws-{}", Uuid::new_v4());
    let (mut sink, mut stream) = socket.split();
    let mut buffer = VoiceBuffer::new(state.config.voice.chunk_size);
    tracing::info!(session = %key, "Voice WebSocket connected");

    if send(&mut sink, &ServerMessage::status(WELCOME)).await.is_ok() {
        while let Some(frame) = stream.next().await {
            let sent = match frame {
                Ok(Message::Text(text)) => {
                    handle_text(&state, &key, text.as_str(), &mut sink).await
                }
                Ok(Message::Binary(bytes)) => {
                    buffer.push(&bytes);
                    let mut sent = Ok(());
                    while let Some(chunk) = buffer.take_chunk() {
                        sent = handle_audio_chunk(&state, &key, &chunk, &mut sink).await;
                        if sent.is_err() {
                            break;
                        }
                    }
                    sent
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!(session = %key, error = %e, "WebSocket receive failed");
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        }
    }

    state.registry.evict(&key);
    tracing::info!(session = %key, "Voice WebSocket disconnected");
}

/// Encode and push one event. Fails once the client has gone away.
async fn send<S>(sink: &mut S, message: &ServerMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(message).map_err(|e| {
        tracing::warn!(error = %e, "Failed to encode WebSocket event");
    })?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handle one JSON command frame.
pub(crate) async fn handle_text<S>(
    state: &AppState,
    key: &str,
    text: &str,
    sink: &mut S,
) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let command = match serde_json::from_str::<ClientMessage>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(session = %key, error = %e, "Ignoring unrecognised WebSocket frame");
            return Ok(());
        }
    };

    match command {
        ClientMessage::Text { message, location } => {
            if message.trim().is_empty() {
                return Ok(());
            }
            let response = run_turn(state, key, &message, location).await;
            send(sink, &response).await
        }
        ClientMessage::Reset => {
            state.registry.session(key).lock().await.reset();
            send(sink, &ServerMessage::status(RESET_DONE)).await
        }
    }
}

/// Transcribe one audio chunk and, if it holds speech, run it as a turn.
///
/// The interim transcript goes out before the turn starts so the client can
/// show what was heard while the reply is produced.
pub(crate) async fn handle_audio_chunk<S>(
    state: &AppState,
    key: &str,
    chunk: &[u8],
    sink: &mut S,
) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let Some(transcriber) = &state.transcriber else {
        return send(sink, &ServerMessage::error(NO_TRANSCRIBER)).await;
    };

    let samples = pcm16_to_f32(chunk);
    let transcript = match transcriber
        .transcribe(&samples, state.config.voice.sample_rate)
        .await
    {
        Ok(transcript) => transcript,
        Err(e) => {
            tracing::warn!(session = %key, error = %e, "Transcription failed");
            return send(sink, &ServerMessage::error(format!("Processing error: {e}"))).await;
        }
    };

    let text = transcript.trim();
    if text.is_empty() {
        return Ok(());
    }

    send(
        sink,
        &ServerMessage::Transcript {
            text: text.to_string(),
            is_final: false,
        },
    )
    .await?;
    let response = run_turn(state, key, text, None).await;
    send(
        sink,
        &ServerMessage::Transcript {
            text: text.to_string(),
            is_final: true,
        },
    )
    .await?;
    send(sink, &response).await
}

async fn run_turn(
    state: &AppState,
    key: &str,
    message: &str,
    location: Option<Location>,
) -> ServerMessage {
    match state.registry.process_message(key, message, location).await {
        Ok(turn) => ServerMessage::Response {
            text: turn.reply,
            tool_result: turn.tool_result,
        },
        Err(e) => ServerMessage::error(format!("Error processing message: {e}")),
    }
}
