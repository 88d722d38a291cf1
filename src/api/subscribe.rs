// src/api/subscribe.rs
// WebSocket subscribe adapter: forwards Broadcaster updates for one
// conversation until the client disconnects.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{AggregatedIntelligence, ConversationKey};

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum Envelope {
    #[serde(rename = "connected")]
    Connected { conversation_id: String },
    #[serde(rename = "intelligence_update")]
    IntelligenceUpdate {
        #[serde(flatten)]
        intelligence: AggregatedIntelligence,
    },
}

pub async fn subscribe_conversation(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((tenant_id, conversation_id)): Path<(String, String)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, tenant_id, conversation_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, tenant_id: String, conversation_id: String) {
    let key = ConversationKey::new(tenant_id, conversation_id.clone());
    let subscriber = state.broadcaster.subscribe(key.clone());
    info!(conversation = %key, "subscriber connected");

    let (mut sink, mut stream) = socket.split();

    let connected = Envelope::Connected {
        conversation_id: conversation_id.clone(),
    };
    if send_envelope(&mut sink, &connected).await.is_err() {
        state.broadcaster.unsubscribe(&key, &subscriber);
        return;
    }

    loop {
        tokio::select! {
            intelligence = subscriber.recv() => {
                let update = Envelope::IntelligenceUpdate { intelligence };
                if send_envelope(&mut sink, &update).await.is_err() {
                    warn!(conversation = %key, "subscriber write failed, closing");
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(conversation = %key, "subscriber closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conversation = %key, error = %e, "subscriber socket error");
                        break;
                    }
                }
            }
        }
    }

    state.broadcaster.unsubscribe(&key, &subscriber);
}

async fn send_envelope(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    envelope: &Envelope,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string());
    sink.send(Message::Text(text.into())).await
}
