//! The realtime bridge: one instance per live call.
//!
//! Joins the carrier's media WebSocket to the model's realtime WebSocket
//! with two pumps running until first completion:
//! - uplink: carrier media frames → `input_audio_buffer.append`
//! - downlink: model events → carrier media frames, transcript capture,
//!   and inline tool-call round-trips
//!
//! All outbound model messages funnel through a single writer task, so
//! audio order and the function_call_output → response.create pairing are
//! preserved by construction.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message as CarrierMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as ModelMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use hv_domain::{Error, Result, ToolCall};
use hv_protocol::carrier::CarrierFrame;
use hv_protocol::realtime::{
    ClientEvent, ConversationItem, ResponseSpec, ServerEvent, SessionConfig, ToolSpec,
};
use hv_sessions::{SessionHandle, SessionStore};

use crate::state::AppState;
use crate::voice::dispatcher::ToolDispatcher;

type ModelSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PING_INTERVAL: Duration = Duration::from_secs(20);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound traffic to the model; a single channel keeps ordering.
enum ModelCommand {
    Event(ClientEvent),
    Ping,
}

/// Run the bridge for an accepted carrier media socket.  Returns when either
/// peer is gone; the caller owns final session teardown.
pub async fn handle(carrier_ws: WebSocket, call_sid: String, state: AppState) {
    let Some(session) = state.sessions.get(&call_sid) else {
        tracing::error!(call_sid = %call_sid, "no session for media stream, dropping socket");
        return;
    };

    let model_ws = match dial_model(&state).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!(call_sid = %call_sid, error = %e, "model dial failed");
            state.sessions.end(&call_sid);
            return;
        }
    };
    tracing::info!(call_sid = %call_sid, "connected to realtime model");

    run_bridge(carrier_ws, model_ws, &call_sid, session, &state).await;

    // Final interaction bump.  Removal happens in the media endpoint wrapper
    // and, independently, via the status webhook.
    state.sessions.update(&call_sid);
    tracing::info!(call_sid = %call_sid, "bridge finished");
}

async fn run_bridge(
    carrier_ws: WebSocket,
    model_ws: ModelSocket,
    call_sid: &str,
    session: SessionHandle,
    state: &AppState,
) {
    let (carrier_sink, carrier_stream) = carrier_ws.split();
    let (model_sink, model_stream) = model_ws.split();

    let (outbound_tx, outbound_rx) = mpsc::channel::<ModelCommand>(256);
    let stream_sid: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let last_seen = Arc::new(Mutex::new(Instant::now()));
    let cancel = CancellationToken::new();

    // Session config + greeting go through the same channel as everything
    // later, so they reach the model first.
    let instructions = {
        let snapshot = session.read();
        state.agent.system_prompt(&snapshot)
    };
    let tools: Vec<ToolSpec> = state
        .agent
        .tool_definitions()
        .iter()
        .map(ToolSpec::from)
        .collect();
    let setup = [
        ClientEvent::SessionUpdate {
            session: SessionConfig::g711_voice_session(
                state.config.realtime.voice.clone(),
                instructions,
                tools,
            ),
        },
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::assistant_text(state.agent.greeting()),
        },
        ClientEvent::ResponseCreate {
            response: Some(ResponseSpec::audio_and_text()),
        },
    ];
    for event in setup {
        if outbound_tx.send(ModelCommand::Event(event)).await.is_err() {
            return;
        }
    }

    let writer = tokio::spawn(write_model(model_sink, outbound_rx));
    let ka = tokio::spawn(keepalive(
        outbound_tx.clone(),
        last_seen.clone(),
        cancel.clone(),
    ));

    let mut uplink = tokio::spawn(uplink_pump(
        carrier_stream,
        outbound_tx.clone(),
        stream_sid.clone(),
        call_sid.to_owned(),
    ));

    let downlink_ctx = Downlink {
        carrier_sink,
        outbound_tx: outbound_tx.clone(),
        stream_sid,
        session,
        dispatcher: state.dispatcher.clone(),
        sessions: state.sessions.clone(),
        call_sid: call_sid.to_owned(),
        last_seen,
    };
    let mut downlink = tokio::spawn(downlink_ctx.run(model_stream));

    // First pump to finish wins; the peer is cancelled.  The keepalive task
    // cancels the token when the model stops answering pings.
    tokio::select! {
        _ = &mut uplink => downlink.abort(),
        _ = &mut downlink => uplink.abort(),
        _ = cancel.cancelled() => {
            uplink.abort();
            downlink.abort();
        }
    }

    cancel.cancel();
    ka.abort();

    // Dropping the last sender lets the writer drain and close the model WS.
    drop(outbound_tx);
    let _ = tokio::time::timeout(Duration::from_secs(5), writer).await;
}

/// Dial the model's realtime endpoint with bearer credential + beta header.
async fn dial_model(state: &AppState) -> Result<ModelSocket> {
    let url = state.config.realtime.dial_url();
    let mut request = url
        .into_client_request()
        .map_err(|e| Error::Ws(e.to_string()))?;

    let bearer = format!("Bearer {}", state.secrets.model_api_key);
    request.headers_mut().insert(
        "Authorization",
        HeaderValue::from_str(&bearer).map_err(|e| Error::Ws(e.to_string()))?,
    );
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    let (ws, _response) = connect_async(request)
        .await
        .map_err(|e| Error::Ws(e.to_string()))?;
    Ok(ws)
}

/// Writer task: the only owner of the model sink.
async fn write_model(
    mut sink: SplitSink<ModelSocket, ModelMessage>,
    mut rx: mpsc::Receiver<ModelCommand>,
) {
    while let Some(command) = rx.recv().await {
        let msg = match command {
            ModelCommand::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => ModelMessage::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize model event");
                    continue;
                }
            },
            ModelCommand::Ping => ModelMessage::Ping(Vec::new()),
        };
        if sink.send(msg).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Keepalive: ping every 20 s; a 10 s pong deadline miss cancels the bridge.
async fn keepalive(
    outbound_tx: mpsc::Sender<ModelCommand>,
    last_seen: Arc<Mutex<Instant>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        if outbound_tx.send(ModelCommand::Ping).await.is_err() {
            break;
        }
        tokio::time::sleep(PING_TIMEOUT).await;
        if last_seen.lock().elapsed() > PING_INTERVAL + PING_TIMEOUT {
            tracing::warn!("model keepalive lapsed, terminating bridge");
            cancel.cancel();
            break;
        }
    }
}

/// Uplink: carrier → model.
async fn uplink_pump(
    mut carrier_stream: SplitStream<WebSocket>,
    outbound_tx: mpsc::Sender<ModelCommand>,
    stream_sid: Arc<Mutex<Option<String>>>,
    call_sid: String,
) {
    while let Some(frame) = carrier_stream.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(call_sid = %call_sid, error = %e, "carrier socket error");
                break;
            }
        };
        match msg {
            CarrierMessage::Text(text) => match serde_json::from_str::<CarrierFrame>(&text) {
                Ok(CarrierFrame::Start { start }) => {
                    tracing::info!(
                        call_sid = %call_sid,
                        stream_sid = %start.stream_sid,
                        "carrier stream started"
                    );
                    *stream_sid.lock() = Some(start.stream_sid);
                }
                Ok(CarrierFrame::Media { media, .. }) => {
                    let event = ClientEvent::InputAudioBufferAppend {
                        audio: media.payload,
                    };
                    if outbound_tx.send(ModelCommand::Event(event)).await.is_err() {
                        break;
                    }
                }
                Ok(CarrierFrame::Stop) => {
                    tracing::info!(call_sid = %call_sid, "carrier stream stopped");
                    break;
                }
                Ok(_) => {}
                // A single bad frame is skipped, not fatal.
                Err(e) => {
                    tracing::debug!(call_sid = %call_sid, error = %e, "skipping undecodable carrier frame");
                }
            },
            CarrierMessage::Close(_) => break,
            _ => {}
        }
    }
}

/// Downlink: model → carrier, plus control event handling.
struct Downlink {
    carrier_sink: SplitSink<WebSocket, CarrierMessage>,
    outbound_tx: mpsc::Sender<ModelCommand>,
    stream_sid: Arc<Mutex<Option<String>>>,
    session: SessionHandle,
    dispatcher: Arc<ToolDispatcher>,
    sessions: Arc<SessionStore>,
    call_sid: String,
    last_seen: Arc<Mutex<Instant>>,
}

impl Downlink {
    async fn run(mut self, mut model_stream: SplitStream<ModelSocket>) {
        while let Some(frame) = model_stream.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(call_sid = %self.call_sid, error = %e, "model socket error");
                    break;
                }
            };
            *self.last_seen.lock() = Instant::now();

            match msg {
                ModelMessage::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        if self.handle_event(event).await.is_break() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(call_sid = %self.call_sid, error = %e, "undecodable model event");
                    }
                },
                ModelMessage::Close(_) => {
                    tracing::info!(call_sid = %self.call_sid, "model closed connection");
                    break;
                }
                ModelMessage::Ping(_) | ModelMessage::Pong(_) => {}
                _ => {}
            }
        }
    }

    async fn handle_event(&mut self, event: ServerEvent) -> ControlFlow<()> {
        match event {
            ServerEvent::ResponseAudioDelta { delta } => {
                if delta.is_empty() {
                    return ControlFlow::Continue(());
                }
                let Some(sid) = self.stream_sid.lock().clone() else {
                    // Audio before the carrier's start frame has nowhere to go.
                    return ControlFlow::Continue(());
                };
                let frame = CarrierFrame::outbound_media(sid, delta);
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize media frame");
                        return ControlFlow::Continue(());
                    }
                };
                if self
                    .carrier_sink
                    .send(CarrierMessage::Text(json))
                    .await
                    .is_err()
                {
                    return ControlFlow::Break(());
                }
            }

            ServerEvent::ResponseAudioTranscriptDone { transcript } => {
                tracing::info!(
                    call_sid = %self.call_sid,
                    "assistant: {}",
                    truncate_chars(&transcript, 100)
                );
            }

            ServerEvent::InputAudioTranscriptionCompleted { transcript } => {
                tracing::info!(
                    call_sid = %self.call_sid,
                    "caller: {}",
                    truncate_chars(&transcript, 100)
                );
                let mut state = self.session.write();
                state.add_fact(format!("User said: {}", truncate_chars(&transcript, 200)));
                state.update_interaction();
            }

            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                return self.tool_round_trip(call_id, name, arguments).await;
            }

            ServerEvent::Error { error } => {
                tracing::error!(call_sid = %self.call_sid, error = %error, "model error event");
            }
            ServerEvent::SessionCreated => {
                tracing::debug!(call_sid = %self.call_sid, "model session created");
            }
            ServerEvent::SessionUpdated => {
                tracing::debug!(call_sid = %self.call_sid, "model session updated");
            }
            ServerEvent::Other => {}
        }
        ControlFlow::Continue(())
    }

    /// Dispatch the tool and reply with exactly one function_call_output
    /// followed by one response.create.  Running inline on the downlink
    /// serializes concurrent tool calls per call_sid.
    async fn tool_round_trip(
        &mut self,
        call_id: String,
        name: String,
        arguments: String,
    ) -> ControlFlow<()> {
        let args = serde_json::from_str(&arguments).unwrap_or_else(|e| {
            tracing::debug!(tool = %name, error = %e, "tool arguments not valid JSON");
            serde_json::json!({})
        });
        let call = ToolCall {
            call_id: call_id.clone(),
            tool_name: name,
            arguments: args,
        };

        let output = self.dispatcher.execute(&call, &self.session).await;
        self.sessions.update(&self.call_sid);

        let reply = ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput { call_id, output },
        };
        if self
            .outbound_tx
            .send(ModelCommand::Event(reply))
            .await
            .is_err()
        {
            return ControlFlow::Break(());
        }
        if self
            .outbound_tx
            .send(ModelCommand::Event(ClientEvent::ResponseCreate {
                response: None,
            }))
            .await
            .is_err()
        {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
