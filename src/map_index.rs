//! Tiered room lookup.
//!
//! Room names in the dataset are far from unique ("The Plains" alone covers a
//! good part of the world), so rooms are keyed three ways with increasing
//! specificity: name, name + description, name + description + exits. A
//! lookup starts with the name and only reaches for the more specific keys
//! while the candidate list is still ambiguous. Ties always go to the room
//! that comes first in the dataset.

use crate::map_data::{Exit, MapData, Room, RoomRef};
use crate::text::{join_key, normalize};
use std::collections::HashMap;
use tracing::debug;

/// Canonical ordering of exit letters in an exit signature
const EXIT_ORDER: [char; 6] = ['N', 'E', 'S', 'W', 'U', 'D'];

/// Compact exit signature: the upper-cased first letter of each exit, one per
/// exit, in compass order, with any other letters after in their input
/// order. `[north, up, east]` becomes `"N E U"`.
pub fn exit_signature(exits: &[Exit]) -> String {
    let mut letters: Vec<char> = exits
        .iter()
        .filter_map(|exit| exit.name.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    // Stable sort keeps residual letters in dataset order
    letters.sort_by_key(|c| EXIT_ORDER.iter().position(|o| o == c).unwrap_or(EXIT_ORDER.len()));

    letters
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Which tier produced a lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Name,
    Description,
    Exits,
}

/// Normalized text keys -> room positions, in dataset order
#[derive(Debug, Clone, Default)]
pub struct RoomIndex {
    by_name: HashMap<String, Vec<RoomRef>>,
    by_description: HashMap<String, Vec<RoomRef>>,
    by_exits: HashMap<String, Vec<RoomRef>>,
}

impl RoomIndex {
    /// Index every room that has both a name and a description
    pub fn build(map: &MapData) -> Self {
        let mut index = Self::default();
        let mut skipped = 0usize;

        for (pos, room) in map.rooms() {
            let name = normalize(&room.name);
            let description = normalize(&room.description);
            if name.is_empty() || description.is_empty() {
                skipped += 1;
                continue;
            }

            let signature = normalize(&exit_signature(&room.exits));
            index.by_exits.entry(join_key(&[&name, &description, &signature])).or_default().push(pos);
            index.by_description.entry(join_key(&[&name, &description])).or_default().push(pos);
            index.by_name.entry(name).or_default().push(pos);
        }

        tracing::info!(
            "Built room index: {} names, {} descriptions, {} exit keys ({} rooms skipped)",
            index.by_name.len(),
            index.by_description.len(),
            index.by_exits.len(),
            skipped
        );
        index
    }

    pub fn name_candidates(&self, name: &str) -> &[RoomRef] {
        lookup(&self.by_name, &normalize(name))
    }

    pub fn description_candidates(&self, name: &str, description: &str) -> &[RoomRef] {
        lookup(&self.by_description, &join_key(&[&normalize(name), &normalize(description)]))
    }

    pub fn exit_candidates(&self, name: &str, description: &str, exits: &str) -> &[RoomRef] {
        let key = join_key(&[&normalize(name), &normalize(description), &normalize(exits)]);
        lookup(&self.by_exits, &key)
    }

    /// Narrow by name, then description, then exits, stopping as soon as the
    /// candidates are unambiguous.
    pub fn lookup(&self, name: &str, description: &str, exits: &str) -> Option<(RoomRef, MatchTier)> {
        let candidates = self.name_candidates(name);
        let &first = candidates.first()?;
        if candidates.len() == 1 {
            return Some((first, MatchTier::Name));
        }

        let refined = self.description_candidates(name, description);
        match refined {
            // Description didn't help; fall back to the first name match
            [] => return Some((first, MatchTier::Name)),
            [only] => return Some((*only, MatchTier::Description)),
            _ => {}
        }

        match self.exit_candidates(name, description, exits).first() {
            Some(&id) => Some((id, MatchTier::Exits)),
            None => Some((refined[0], MatchTier::Description)),
        }
    }

    /// Tier sizes and ambiguity counts, for diagnostics
    pub fn stats(&self) -> IndexStats {
        let ambiguous = |tier: &HashMap<String, Vec<RoomRef>>| tier.values().filter(|ids| ids.len() > 1).count();
        IndexStats {
            names: self.by_name.len(),
            ambiguous_names: ambiguous(&self.by_name),
            descriptions: self.by_description.len(),
            ambiguous_descriptions: ambiguous(&self.by_description),
            exit_keys: self.by_exits.len(),
            ambiguous_exit_keys: ambiguous(&self.by_exits),
        }
    }
}

fn lookup<'a>(tier: &'a HashMap<String, Vec<RoomRef>>, key: &str) -> &'a [RoomRef] {
    tier.get(key).map(Vec::as_slice).unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub names: usize,
    pub ambiguous_names: usize,
    pub descriptions: usize,
    pub ambiguous_descriptions: usize,
    pub exit_keys: usize,
    pub ambiguous_exit_keys: usize,
}

/// Resolves room description blocks against the map
#[derive(Debug, Clone)]
pub struct RoomResolver {
    map: MapData,
    index: RoomIndex,
}

impl RoomResolver {
    pub fn new(map: MapData) -> Self {
        let index = RoomIndex::build(&map);
        Self { map, index }
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn index(&self) -> &RoomIndex {
        &self.index
    }

    /// Best room for the block, or None for an unknown location
    pub fn resolve(&self, name: &str, description: &str, exits: &str) -> Option<&Room> {
        match self.index.lookup(name, description, exits) {
            Some((pos, tier)) => {
                let room = self.map.room_at(pos)?;
                debug!("Resolved '{}' to room {} via {:?}", name, room.id, tier);
                Some(room)
            }
            None => {
                debug!("Unknown location: '{}'", name);
                None
            }
        }
    }
}
