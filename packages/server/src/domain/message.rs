//! Wire texts and line interpretation.
//!
//! Every server-originated line is built here so the protocol wording lives
//! in one place.

pub const ROOM_PROMPT: &str = "Enter the chatroom name to join or create: ";
pub const USERNAME_PROMPT: &str = "Enter your username: ";
pub const GOODBYE: &str = "Goodbye!\n";
pub const SERVER_FULL: &str = "Server is full, try again later\n";

const QUIT_KEYWORDS: [&str; 2] = ["/quit", "/exit"];

/// A line received from a client, interpreted for the active state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// Ends the session.
    Quit,
    /// Ordinary chat text (already trimmed).
    Text(String),
}

impl ClientLine {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if QUIT_KEYWORDS
            .iter()
            .any(|keyword| text.eq_ignore_ascii_case(keyword))
        {
            ClientLine::Quit
        } else {
            ClientLine::Text(text.to_string())
        }
    }
}

/// Format a user message for relay: `"<name>: <text>\n"`.
pub fn format_chat_message(display_name: &str, text: &str) -> String {
    format!("{}: {}\n", display_name, text)
}

pub fn format_joined_notice(display_name: &str) -> String {
    format!("{} has joined the chatroom\n", display_name)
}

pub fn format_left_notice(display_name: &str) -> String {
    format!("{} has left the chatroom\n", display_name)
}
