//! WebSocket client session management.
//!
//! One session is one WebSocket connection. The session task owns the
//! [`NegotiationManager`] and multiplexes four sources: server frames, prompt
//! lines, media/timer input from the manager's inbox and the manager's
//! outbound signaling.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use kupid_shared::protocol::{ClientEvent, ServerEvent};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    domain::{CommandAction, parse_command, plan_command},
    error::ClientError,
    formatter::MessageFormatter,
    negotiation::{
        NegotiationConfig, NegotiationManager, PeerConnectionFactory, loopback::LoopbackFactory,
    },
    ui::redisplay_prompt,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Settings that survive reconnects
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    /// Held for the client's lifetime, reused on every reconnect
    pub session: String,
    /// Room to join on the first connection
    pub room: Option<String>,
    /// Subscribe to lobby updates
    pub lobby: bool,
    /// Enter the matchmaking queue when not in a room
    pub queue: bool,
    pub negotiation: NegotiationConfig,
}

/// Run one WebSocket client session
///
/// # Arguments
///
/// * `options` - Connection settings
/// * `room` - The room to (re)join; updated to the room the client is in when
///   the session ends
/// * `input_rx` - Prompt lines
///
/// # Returns
///
/// `Ok(())` when the user quits, an error when the connection is lost.
pub async fn run_client_session(
    options: &SessionOptions,
    room: &mut Option<String>,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(options.url.as_str())
        .await
        .map_err(connect_error)?;

    tracing::info!("Connected to Kupid server!");
    println!(
        "\nYou are '{}'. Type /join <room>, /queue or a chat message. Press Ctrl+C to exit.\n",
        options.session
    );

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let factory: Arc<dyn PeerConnectionFactory> = Arc::new(LoopbackFactory::default());
    let (mut manager, mut inbox) = NegotiationManager::new(
        options.session.clone(),
        options.negotiation.clone(),
        factory,
        outbound_tx.clone(),
    );

    let session = options.session.as_str();
    queue_event(
        &outbound_tx,
        ClientEvent::RegisterSession {
            session: session.to_string(),
        },
    );
    if options.lobby {
        queue_event(&outbound_tx, ClientEvent::JoinLobby);
    }
    match room.as_deref() {
        Some(room_id) => manager.join_room(room_id).await,
        None if options.queue => queue_event(
            &outbound_tx,
            ClientEvent::EnterMatchmakingQueue {
                session: session.to_string(),
            },
        ),
        None => {}
    }

    let result = loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(text.as_str(), &mut manager).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    break Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break Err(ClientError::ConnectionError(e.to_string()));
                }
                Some(Ok(_)) => {}
            },
            line = input_rx.recv() => {
                let Some(line) = line else {
                    manager.leave_room().await;
                    break Ok(());
                };
                if handle_line(&line, &mut manager, &outbound_tx).await {
                    break Ok(());
                }
            }
            Some(input) = inbox.recv() => {
                manager.handle_input(input).await;
            }
            Some(event) = outbound_rx.recv() => {
                if let Err(e) = send_event(&mut write, &event).await {
                    break Err(e);
                }
            }
        }
    };

    *room = manager.room().map(str::to_string);

    if result.is_ok() {
        // Deliver the leave-room queued on quit before closing
        while let Ok(event) = outbound_rx.try_recv() {
            if send_event(&mut write, &event).await.is_err() {
                break;
            }
        }
        write.close().await.ok();
    }

    manager.reset().await;
    result
}

/// Parse, display and route one server frame
async fn handle_frame(text: &str, manager: &mut NegotiationManager) {
    let event = match ServerEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Failed to parse server event: {}", e);
            print!("{}", MessageFormatter::format_raw_message(text));
            redisplay_prompt(manager.local_session());
            return;
        }
    };

    if let Some(formatted) = MessageFormatter::format_event(&event, manager.local_session()) {
        print!("{}", formatted);
        redisplay_prompt(manager.local_session());
    }

    match &event {
        ServerEvent::MatchFound { room_id } | ServerEvent::RoomCreated { room_id } => {
            manager.join_room(room_id).await;
        }
        _ => manager.handle_server_event(&event).await,
    }
}

/// Handle one prompt line; returns `true` when the user quits
async fn handle_line(
    line: &str,
    manager: &mut NegotiationManager,
    outbound: &mpsc::UnboundedSender<ClientEvent>,
) -> bool {
    let action = parse_command(line).and_then(|command| {
        plan_command(command, manager.local_session(), manager.room())
    });

    match action {
        Ok(CommandAction::Join(room_id)) => manager.join_room(&room_id).await,
        Ok(CommandAction::Leave) => manager.leave_room().await,
        Ok(CommandAction::Send(event)) => queue_event(outbound, event),
        Ok(CommandAction::Quit) => {
            manager.leave_room().await;
            return true;
        }
        Err(e) => {
            println!("\n! {}", e);
            redisplay_prompt(manager.local_session());
        }
    }
    false
}

fn queue_event(outbound: &mpsc::UnboundedSender<ClientEvent>, event: ClientEvent) {
    if outbound.send(event).is_err() {
        tracing::debug!("outbound channel closed, dropping event");
    }
}

async fn send_event(write: &mut WsSink, event: &ClientEvent) -> Result<(), ClientError> {
    let json = event.to_json()?;
    write.send(Message::Text(json.into())).await.map_err(|e| {
        tracing::warn!("Failed to send message: {}", e);
        ClientError::ConnectionError(e.to_string())
    })
}

/// Malformed URLs and HTTP-level rejections will not improve by retrying
fn connect_error(error: tungstenite::Error) -> ClientError {
    match error {
        tungstenite::Error::Url(e) => ClientError::Protocol(e.to_string()),
        tungstenite::Error::Http(response) => {
            ClientError::Protocol(format!("server rejected upgrade: {}", response.status()))
        }
        other => ClientError::ConnectionError(other.to_string()),
    }
}
