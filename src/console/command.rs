use chrono::DateTime;

use crate::broker::message::Message;
use crate::broker::registry::UserId;
use crate::client::validate_user_id;
use crate::utils::error::CommandError;

/// One line of console input.
///
/// ```text
/// alice > bob: hello        unicast
/// alice > *: hello all      broadcast
/// /join alice
/// /leave alice
/// /history [alice]
/// /quit
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(Message),
    Join(UserId),
    Leave(UserId),
    History(Option<UserId>),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        match line.strip_prefix('/') {
            Some(rest) => Self::parse_slash(rest),
            None => Self::parse_message(line),
        }
    }

    fn parse_slash(rest: &str) -> Result<Self, CommandError> {
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match name {
            "join" | "leave" => {
                let id = arg.ok_or_else(|| CommandError::MissingArgument(name.to_string()))?;
                validate_user_id(id)?;
                if name == "join" {
                    Ok(Command::Join(id.to_string()))
                } else {
                    Ok(Command::Leave(id.to_string()))
                }
            }
            "history" => Ok(Command::History(arg.map(str::to_string))),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    fn parse_message(line: &str) -> Result<Self, CommandError> {
        let malformed = || CommandError::Malformed(line.to_string());

        let (route, text) = line.split_once(':').ok_or_else(malformed)?;
        let (sender, target) = route.split_once('>').ok_or_else(malformed)?;
        let (sender, target, text) = (sender.trim(), target.trim(), text.trim());

        validate_user_id(sender)?;
        if target == "*" {
            return Ok(Command::Send(Message::broadcast(sender, text)));
        }
        validate_user_id(target)?;
        Ok(Command::Send(Message::unicast(sender, target, text)))
    }
}

/// Format a delivered or stored message for display.
pub fn render(msg: &Message) -> String {
    let time = DateTime::from_timestamp(msg.timestamp, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| msg.timestamp.to_string());
    let target = if msg.broadcast { "*" } else { msg.recipient.as_str() };
    format!("{time} {} > {target}: {}", msg.sender, msg.content)
}
