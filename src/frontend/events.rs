//! Frontend-agnostic input events.
//!
//! Frontends translate what the user typed into this enum so the runtime loop
//! only handles one event shape. Lines starting with `.` are client commands;
//! everything else goes to the game.

/// Prefix marking a client-side command
pub const CLIENT_COMMAND_PREFIX: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendEvent {
    /// A command line for the game server
    Command(String),
    /// (Re)connect the transport
    Connect,
    /// List recently seen words
    RecentWords,
    /// Show the tracked map location
    Location,
    /// Application quit signal
    Quit,
    /// Unrecognised client command
    Unknown(String),
}

impl FrontendEvent {
    /// Interpret one line of user input. Game commands are passed on as
    /// typed; the session trims each `;` part itself.
    pub fn from_input(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(client_cmd) = trimmed.strip_prefix(CLIENT_COMMAND_PREFIX) else {
            return Self::Command(line.to_string());
        };

        match client_cmd.to_lowercase().as_str() {
            "connect" | "reconnect" => Self::Connect,
            "words" => Self::RecentWords,
            "where" => Self::Location,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}
