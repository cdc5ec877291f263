//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use kupid_shared::protocol::ClientEvent;

use crate::error::ClientError;

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Join(String),
    Leave,
    Queue,
    Unqueue,
    Create(String),
    Rounds,
    React(String),
    Quit,
    Chat(String),
}

/// Parse a prompt line
///
/// Lines that do not start with `/` are chat messages.
///
/// # Errors
///
/// `ClientError::InvalidCommand` for unknown commands or missing arguments
pub fn parse_command(line: &str) -> Result<UserCommand, ClientError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(UserCommand::Chat(line.to_string()));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let required = |arg: Option<&str>| {
        arg.map(str::to_string)
            .ok_or_else(|| ClientError::InvalidCommand(format!("/{} needs an argument", name)))
    };

    match name {
        "join" => Ok(UserCommand::Join(required(arg)?)),
        "create" => Ok(UserCommand::Create(required(arg)?)),
        "react" => Ok(UserCommand::React(required(arg)?)),
        "leave" => Ok(UserCommand::Leave),
        "queue" => Ok(UserCommand::Queue),
        "unqueue" => Ok(UserCommand::Unqueue),
        "rounds" => Ok(UserCommand::Rounds),
        "quit" | "exit" => Ok(UserCommand::Quit),
        _ => Err(ClientError::InvalidCommand(format!("unknown command /{}", name))),
    }
}

/// What the session loop does with a parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    /// Set up negotiation for a room (leaving the current one)
    Join(String),
    Leave,
    Send(ClientEvent),
    Quit,
}

/// Translate a command into a session action
///
/// # Arguments
///
/// * `command` - The parsed prompt line
/// * `session` - This client's session id
/// * `room` - The room the client is currently in, if any
///
/// # Errors
///
/// `ClientError::InvalidCommand` for room-scoped commands issued outside a room
pub fn plan_command(
    command: UserCommand,
    session: &str,
    room: Option<&str>,
) -> Result<CommandAction, ClientError> {
    let in_room = || {
        room.map(str::to_string)
            .ok_or_else(|| ClientError::InvalidCommand("not in a room".to_string()))
    };

    let action = match command {
        UserCommand::Join(room_id) => CommandAction::Join(room_id),
        UserCommand::Leave => CommandAction::Leave,
        UserCommand::Quit => CommandAction::Quit,
        UserCommand::Queue => CommandAction::Send(ClientEvent::EnterMatchmakingQueue {
            session: session.to_string(),
        }),
        UserCommand::Unqueue => CommandAction::Send(ClientEvent::LeaveMatchmakingQueue {
            session: session.to_string(),
        }),
        UserCommand::Create(room_id) => CommandAction::Send(ClientEvent::CreateRoom {
            session: session.to_string(),
            room_id,
        }),
        UserCommand::Rounds => CommandAction::Send(ClientEvent::StartRounds { room_id: in_room()? }),
        UserCommand::React(reaction) => CommandAction::Send(ClientEvent::SendReaction {
            room_id: in_room()?,
            reaction,
        }),
        UserCommand::Chat(message) => CommandAction::Send(ClientEvent::SendChatMessage {
            room_id: in_room()?,
            session: session.to_string(),
            message,
        }),
    };
    Ok(action)
}

/// Check if the client should exit immediately based on the error type.
///
/// # Arguments
///
/// * `error` - The client error to check
///
/// # Returns
///
/// `true` if the error cannot be fixed by reconnecting (e.g., Protocol),
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::Protocol(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}
