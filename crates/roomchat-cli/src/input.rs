//! Parsing of stdin lines into user actions.

use roomchat_client::ViewIntent;

pub const HELP: &str = "\
Commands:
  /join <room> [name]  join a room, optionally with a display name
  /leave               leave the current room
  /quit                exit
  /help                show this help
Anything else is sent as a chat message.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Intent(ViewIntent),
    Help,
    Quit,
    /// Blank line.
    Nothing,
    /// A command that could not be parsed; the text explains why.
    Invalid(String),
}

/// Parse a line. `default_name` is used by `/join` without a name.
pub fn parse_line(line: &str, default_name: Option<&str>) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Input::Nothing;
    }
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Input::Intent(ViewIntent::Send {
            text: line.to_string(),
        });
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "join" | "j" => {
            let Some(room_id) = parts.next() else {
                return Input::Invalid("usage: /join <room> [name]".into());
            };
            let rest: Vec<&str> = parts.collect();
            let display_name = if rest.is_empty() {
                default_name.map(str::to_string)
            } else {
                Some(rest.join(" "))
            };
            Input::Intent(ViewIntent::Join {
                room_id: room_id.to_string(),
                display_name,
            })
        }
        "leave" => Input::Intent(ViewIntent::Leave),
        "quit" | "exit" | "q" => Input::Quit,
        "help" | "?" => Input::Help,
        other => Input::Invalid(format!("unknown command /{other}; try /help")),
    }
}
