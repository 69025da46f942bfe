use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, trace, warn};
use uuid::Uuid;

use cipherchan_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Longest chat line relayed, in characters.
const MAX_LINE_CHARS: usize = 2000;

/// Handle a WebSocket that was authenticated, and checked for channel
/// membership, at the HTTP upgrade layer.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    channel_id: i64,
    user_id: Uuid,
    username: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to channel {} live feed", username, user_id, channel_id);

    // Subscribe before Ready so nothing published after Ready is missed
    let mut events = dispatcher.subscribe(channel_id).await;

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
        channel_id,
    };
    let ready_sent = match serde_json::to_string(&ready) {
        Ok(text) => sender.send(Message::Text(text.into())).await.is_ok(),
        Err(_) => false,
    };
    if !ready_sent {
        drop(events);
        dispatcher.release(channel_id).await;
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward channel events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = events.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(n)) => {
                            warn!("Channel {} receiver lagged by {} messages", channel_id, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let dispatcher_recv = dispatcher.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(GatewayCommand::Send { message }) => {
                        relay_line(&dispatcher_recv, channel_id, &username_recv, &message).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            username_recv,
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            send_task.abort();
            // The receiver must be dropped before the idle-topic check
            let _ = send_task.await;
        }
    }

    dispatcher.release(channel_id).await;
    info!("{} ({}) left channel {} live feed", username, user_id, channel_id);
}

async fn relay_line(dispatcher: &Dispatcher, channel_id: i64, username: &str, message: &str) {
    let line = message.trim();
    if line.is_empty() {
        return;
    }
    let len = line.chars().count();
    if len > MAX_LINE_CHARS {
        warn!("{} sent an oversized line ({} chars) to channel {}, dropped", username, len, channel_id);
        return;
    }

    let reached = dispatcher.publish(channel_id, line).await;
    trace!("{} -> channel {} reached {} subscribers", username, channel_id, reached);
}
