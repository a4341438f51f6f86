//! WebSocket push channel for live subscribers.
//!
//! Subscribers authenticate with a bearer header or a `token` query
//! parameter (browsers cannot set headers on WebSocket upgrade). Each
//! connection owns one bus subscription; events are forwarded in
//! publication order and the subscription is torn down on close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Handler for WebSocket subscriptions.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = query.token.or_else(|| auth::bearer_token(&headers));
    let claims = match token.and_then(|t| auth::decode_claims(&t, &state.config().jwt_secret).ok())
    {
        Some(claims) => claims,
        None => return crate::error::ApiError::Unauthenticated.into_response(),
    };

    tracing::debug!("WS subscriber {} connecting", claims.email);
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.bus.subscribe();
    let subscriber_id = subscription.id;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = subscription.rx.recv() => {
                let Some(event) = event else {
                    // Bus evicted this subscriber (drop grace exceeded).
                    break;
                };
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum; other inbound frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.bus.unsubscribe(subscriber_id);
    tracing::debug!("WS subscriber {} disconnected", subscriber_id);
}
