//! Session orchestration
//!
//! Connects framed lines to the trigger classifier, the output panes and the
//! room resolver, and turns submitted commands into outbound envelopes. The
//! session is synchronous and frontend-agnostic: it returns
//! [`SessionEvent`]s and leaves drawing to the frontend.

use crate::ansi::StyledSegment;
use crate::config::Config;
use crate::core::console::Console;
use crate::core::triggers::{RoomBlock, Triggers};
use crate::framer::LineEvent;
use crate::map_data::{AreaId, LevelId, RoomId};
use crate::map_index::RoomResolver;
use crate::protocol::Envelope;
use anyhow::Result;
use regex::Regex;
use std::collections::VecDeque;

/// Number of distinct recent words remembered
const RECENT_WORDS: usize = 100;

/// Colour used to echo submitted commands
const ECHO_STYLE: &str = "\x1b[90m";
const RESET_STYLE: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Main,
    Comms,
}

/// Where the player is on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub area_id: AreaId,
    pub level: LevelId,
    pub room_id: RoomId,
}

/// What a frontend should draw
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Append segments to the pane's open line
    Write { pane: Pane, segments: Vec<StyledSegment> },
    /// End the pane's open line
    Newline { pane: Pane },
    /// The resolver placed the player in a room
    LocationChanged(Location),
}

/// Most recent distinct words seen in game output
#[derive(Debug, Clone)]
pub struct RecentWords {
    words: VecDeque<String>,
    capacity: usize,
    pattern: Regex,
}

impl RecentWords {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: VecDeque::with_capacity(capacity + 1),
            capacity,
            pattern: Regex::new(r"(?-u:\b\w{2,}\b)").expect("static word pattern"),
        }
    }

    pub fn observe(&mut self, text: &str) {
        for word in self.pattern.find_iter(text) {
            let word = word.as_str();
            // Move to most-recent position
            if let Some(pos) = self.words.iter().position(|w| w == word) {
                self.words.remove(pos);
            }
            self.words.push_back(word.to_string());
            if self.words.len() > self.capacity {
                self.words.pop_front();
            }
        }
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

}

pub struct Session {
    pub main: Console,
    pub comms: Console,
    triggers: Triggers,
    /// None when the map failed to load; room blocks are then ignored
    resolver: Option<RoomResolver>,
    location: Option<Location>,
    room_name: Option<String>,
    /// A tick glyph was written and its line is still open
    trailing: bool,
    recent_words: RecentWords,
}

impl Session {
    pub fn new(config: &Config, resolver: Option<RoomResolver>) -> Result<Self> {
        Ok(Self {
            main: Console::new(Pane::Main, config.ui.buffer_size),
            comms: Console::new(Pane::Comms, config.ui.buffer_size),
            triggers: Triggers::from_config(&config.triggers)?,
            resolver,
            location: None,
            room_name: None,
            trailing: false,
            recent_words: RecentWords::new(RECENT_WORDS),
        })
    }

    #[cfg(test)]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Process one framed line from the server
    pub fn handle_line(&mut self, line: &LineEvent) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let text = line.text.as_str();

        let classification = self.triggers.classify(text);
        if classification.comms {
            self.comms.writeln(text, &mut events);
        }
        if let Some(block) = classification.room {
            self.locate(&block, &mut events);
        }

        self.recent_words.observe(text);

        // A new non-tick line ends the open spinner line
        if self.trailing && !line.is_timer_tick {
            self.main.writeln("", &mut events);
            self.trailing = false;
        }

        if line.is_timer_tick {
            self.main.write(text, &mut events);
            self.trailing = true;
        } else {
            self.main.writeln(text, &mut events);
        }

        events
    }

    /// Show a client status line (connection state, errors)
    pub fn system(&mut self, text: &str) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.end_trailing(&mut events);
        self.main.writeln(text, &mut events);
        events
    }

    /// Echo a command line and split it into one envelope per `;` part
    pub fn submit(&mut self, command: &str) -> (Vec<SessionEvent>, Vec<Envelope>) {
        let mut events = Vec::new();
        self.end_trailing(&mut events);
        self.main
            .writeln(&format!("{}{}{}", ECHO_STYLE, command, RESET_STYLE), &mut events);

        let envelopes = command
            .split(';')
            .map(|part| Envelope::command(part.trim()))
            .collect();
        (events, envelopes)
    }

    /// Forget per-stream state before a new connection: the open spinner
    /// line, a half-read room block and any style left open
    pub fn reset_stream(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.end_trailing(&mut events);
        self.triggers.reset();
        self.main.reset_style();
        self.comms.reset_style();
        events
    }

    /// Status line listing recent words, newest first
    pub fn show_recent_words(&mut self) -> Vec<SessionEvent> {
        let words: Vec<&str> = self.recent_words.iter().rev().collect();
        let text = if words.is_empty() {
            "No recent words.".to_string()
        } else {
            format!("Recent words: {}", words.join(" "))
        };
        self.system(&text)
    }

    /// Status line describing the tracked location
    pub fn show_location(&mut self) -> Vec<SessionEvent> {
        let text = match (&self.location, &self.room_name) {
            (Some(loc), Some(name)) => format!(
                "Location: {} (room {}, area {}, level {})",
                name, loc.room_id, loc.area_id, loc.level
            ),
            _ if self.resolver.is_none() => "Location unknown (no map loaded).".to_string(),
            _ => "Location unknown.".to_string(),
        };
        self.system(&text)
    }

    fn end_trailing(&mut self, events: &mut Vec<SessionEvent>) {
        if self.trailing {
            self.main.writeln("", events);
            self.trailing = false;
        }
    }

    fn locate(&mut self, block: &RoomBlock, events: &mut Vec<SessionEvent>) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        // A miss leaves the previous location in place
        let Some(room) = resolver.resolve(&block.name, &block.description, &block.exits) else {
            return;
        };

        let location = Location {
            area_id: room.area_id,
            level: room.level(),
            room_id: room.id,
        };
        tracing::info!("Room detected: {} ({}) in area {}", room.name, room.id, room.area_id);
        self.location = Some(location);
        self.room_name = Some(room.name.clone());
        events.push(SessionEvent::LocationChanged(location));
    }
}
