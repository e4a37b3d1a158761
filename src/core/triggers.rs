//! Line classification
//!
//! Decides which framed lines are conversation (copied to the comms pane) and
//! assembles room description blocks for the map resolver. A block starts at
//! a line that is exactly a cyan room name, collects body lines, and ends at
//! the exits line.

use crate::config::TriggerConfig;
use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use regex::Regex;

/// A complete room description as it scrolled past
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomBlock {
    pub name: String,
    /// Body lines, each followed by `\n`
    pub description: String,
    /// Exit letters as printed by the game, e.g. `"N E S"`
    pub exits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub comms: bool,
    pub room: Option<RoomBlock>,
}

#[derive(Debug, Clone)]
struct PendingRoom {
    name: String,
    description: String,
}

#[derive(Debug, Clone)]
pub struct Triggers {
    comms: AhoCorasick,
    room_name: Regex,
    exits_marker: String,
    exits: Regex,
    pending: Option<PendingRoom>,
}

impl Triggers {
    pub fn from_config(config: &TriggerConfig) -> Result<Self> {
        let comms = AhoCorasick::new(&config.comms_phrases).context("Invalid comms phrases")?;
        let room_name = Regex::new(&config.room_name_pattern)
            .with_context(|| format!("Invalid room name pattern: {}", config.room_name_pattern))?;
        let exits = Regex::new(&config.room_exits_pattern)
            .with_context(|| format!("Invalid room exits pattern: {}", config.room_exits_pattern))?;

        Ok(Self {
            comms,
            room_name,
            exits_marker: config.room_exits_marker.clone(),
            exits,
            pending: None,
        })
    }

    /// True while a room block has started but not yet ended
    #[cfg(test)]
    pub fn in_room_block(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop a half-read room block (the stream it came from is gone)
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Classify one raw (unrendered) line
    pub fn classify(&mut self, text: &str) -> Classification {
        let comms = self.comms.is_match(text);
        let room = self.track_room(text);
        Classification { comms, room }
    }

    fn track_room(&mut self, text: &str) -> Option<RoomBlock> {
        if let Some(caps) = self.room_name.captures(text) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            self.pending = Some(PendingRoom {
                name: name.to_string(),
                description: String::new(),
            });
            return None;
        }

        let pending = self.pending.as_mut()?;
        if !text.contains(&self.exits_marker) {
            pending.description.push_str(text);
            pending.description.push('\n');
            return None;
        }

        let exits = self
            .exits
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let PendingRoom { name, description } = self.pending.take()?;
        tracing::debug!("Room block: {:?} exits {:?}", name, exits);
        Some(RoomBlock {
            name,
            description,
            exits,
        })
    }
}
