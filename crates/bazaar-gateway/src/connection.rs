use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use bazaar_auth::SessionUser;
use bazaar_db::Database;
use bazaar_types::error::MarketError;
use bazaar_types::events::{ChatCommand, ChatEvent};

use crate::chat;
use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Apply one client command on the conversation for `joined`.
///
/// `Break` means the socket should close: the sender's session is gone,
/// either logged out, expired or owned by an account that went dormant.
pub fn handle_command(
    db: &Database,
    dispatcher: &Dispatcher,
    token: &str,
    joined: Uuid,
    command: ChatCommand,
) -> ControlFlow<()> {
    let ChatCommand::SendMessage { product_id, message } = command;
    if product_id != joined {
        warn!("Ignored message for {} sent on the chat of {}", product_id, joined);
        return ControlFlow::Continue(());
    }

    match chat::post(db, dispatcher, token, product_id, &message) {
        Ok(_) => ControlFlow::Continue(()),
        Err(MarketError::NotAuthenticated) => ControlFlow::Break(()),
        Err(e) => {
            warn!("Could not post to {}: {}", product_id, e);
            ControlFlow::Continue(())
        }
    }
}

/// Whether `token` still names a live session. Storage failures count as
/// alive.
pub fn session_alive(db: &Database, token: &str) -> bool {
    match bazaar_auth::session::resolve(db, token) {
        Ok(_) => true,
        Err(MarketError::NotAuthenticated) => false,
        Err(e) => {
            warn!("Session check failed: {}", e);
            true
        }
    }
}

/// Run one chat WebSocket. The session was checked at the HTTP upgrade;
/// `token` is kept so every posted message and every heartbeat re-checks it.
pub async fn handle_connection(
    socket: WebSocket,
    db: Arc<Database>,
    dispatcher: Dispatcher,
    user: SessionUser,
    token: String,
    product_id: Uuid,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) joined chat for product {}", user.username, user.id, product_id);

    let ready = ChatEvent::Ready {
        username: user.username.clone(),
        product_id,
    };
    let ready = match serde_json::to_string(&ready) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize ready event: {}", e);
            return;
        }
    };
    if sender.send(Message::Text(ready.into())).await.is_err() {
        return;
    }

    let mut subscription = dispatcher.join(product_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward conversation events -> client, with heartbeat
    let beat_db = db.clone();
    let beat_token = token.clone();
    let beat_user = user.username.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = subscription.recv() => {
                    let Some(json) = event else { break };
                    if sender.send(Message::Text(json.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    let db = beat_db.clone();
                    let token = beat_token.clone();
                    match tokio::task::spawn_blocking(move || session_alive(&db, &token)).await {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("{} session ended, closing chat", beat_user);
                            break;
                        }
                        Err(e) => error!("spawn_blocking join error: {}", e),
                    }
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let username = user.username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatCommand>(&text) {
                    Ok(command) => {
                        let db = db.clone();
                        let dispatcher = dispatcher.clone();
                        let token = token.clone();
                        let flow = tokio::task::spawn_blocking(move || {
                            handle_command(&db, &dispatcher, &token, product_id, command)
                        })
                        .await;

                        match flow {
                            Ok(ControlFlow::Continue(())) => {}
                            Ok(ControlFlow::Break(())) => {
                                warn!("{} session no longer valid, closing chat", username);
                                break;
                            }
                            Err(e) => error!("spawn_blocking join error: {}", e),
                        }
                    }
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("{} bad command: {} -- raw: {}", username, e, raw);
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
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} ({}) left chat for product {}", user.username, user.id, product_id);
}
