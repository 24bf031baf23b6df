use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use futures::StreamExt;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::interval;
use ygg_conductor::Command;
use ygg_conductor::Mode;
use ygg_core::UserId;
use ygg_gateway::heartbeat::Heartbeat;
use ygg_gateway::identity;
use ygg_gateway::wire::ClientMessage;
use ygg_gateway::wire::ServerMessage;

use crate::registry::ConnectionId;
use crate::show::ShowHandle;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Upgrades an HTTP request to a WebSocket connection and bridges it to the
/// show actor's command queue (spec.md §4.6 Gateway).
///
/// The connection is not registered with the [`crate::registry::Registry`]
/// until the client's first `join` message arrives — only then is its role
/// (`mode`) and stable `userId` known (spec.md §6: "On connect: client
/// presents `{userId?, showId, seatId?, mode, lastVersion}`").
pub async fn ws_route(
    req: HttpRequest,
    body: web::Payload,
    handle: web::Data<ShowHandle>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut stream) = actix_ws::handle(&req, body)?;
    let connection_id = ConnectionId::new_v4();
    let (tx, mut rx) = unbounded_channel::<String>();

    actix_web::rt::spawn(async move {
        let mut heartbeat = Heartbeat::with_defaults();
        let mut ping_interval = interval(heartbeat.ping_interval());
        let mut identity: Option<(UserId, Mode)> = None;

        'session: loop {
            tokio::select! {
                biased;
                outbound = rx.recv() => match outbound {
                    Some(text) => if session.text(text).await.is_err() { break 'session },
                    None => break 'session,
                },
                _ = ping_interval.tick() => {
                    if heartbeat.expired() {
                        log::info!("connection {connection_id} missed heartbeat, disconnecting");
                        break 'session;
                    }
                    if session.text(ServerMessage::ping().to_json()).await.is_err() {
                        break 'session;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(actix_ws::Message::Text(text))) => {
                        heartbeat.touch();
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Join { user_id, seat_id, mode, .. }) => {
                                let resolved = identity::issue_or_reuse(user_id);
                                identity = Some((resolved, mode));
                                handle.register(connection_id, mode, tx.clone());
                                handle.bind_user(connection_id, resolved);
                                handle.submit(
                                    Command::Join { user_id: resolved, seat_id, mode, timestamp: now_ms() },
                                    Some(connection_id),
                                    mode,
                                );
                            }
                            Ok(ClientMessage::Command { command }) => {
                                let Some((_, mode)) = identity else {
                                    log::warn!("command before join on connection {connection_id}");
                                    continue 'session;
                                };
                                handle.submit(command, Some(connection_id), mode);
                            }
                            Ok(ClientMessage::Pong) => {}
                            Err(error) => {
                                log::warn!("malformed client message on {connection_id}: {error}");
                            }
                        }
                    }
                    Some(Ok(actix_ws::Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break 'session;
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) | None => break 'session,
                    Some(Err(error)) => {
                        log::warn!("websocket error on {connection_id}: {error}");
                        break 'session;
                    }
                    _ => {}
                },
            }
        }

        if let Some((user_id, mode)) = identity {
            handle.submit(Command::Leave { user_id, timestamp: now_ms() }, None, mode);
        }
        handle.unregister(connection_id);
    });

    Ok(response)
}
