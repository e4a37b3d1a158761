//! Map dataset loading.
//!
//! The dataset is a JSON export of every area, room and label in the game
//! world. [`MapFile`] mirrors the file layout; [`MapData`] is the prepared
//! form the rest of the client reads. Preparing a file inverts the Y axis to
//! match the top-down render convention, and because `MapData` can only be
//! built from a `MapFile`, the inversion happens exactly once per load.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

pub type AreaId = i64;
pub type RoomId = i64;
pub type LevelId = i32;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid label image data: {0}")]
    Image(#[from] base64::DecodeError),
}

/// Raw dataset as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFile {
    pub areas: Vec<MapFileArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFileArea {
    pub id: AreaId,
    #[serde(default)]
    pub rooms: Vec<MapFileRoom>,
    #[serde(default)]
    pub labels: Vec<MapFileLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFileRoom {
    pub id: RoomId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_data: UserData,
    pub coordinates: [i32; 3],
    #[serde(default)]
    pub exits: Vec<Exit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exit {
    pub name: String,
    pub exit_id: RoomId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFileLabel {
    pub coordinates: [f64; 3],
    pub size: [f64; 2],
    #[serde(default)]
    pub image: Vec<String>,
}

/// Position of a room inside [`MapData`]: `(area index, room index)`.
///
/// Room ids are not guaranteed unique across areas, so the room index refers
/// to rooms by position rather than by id.
pub type RoomRef = (usize, usize);

/// A room with its coordinates in render orientation
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub area_id: AreaId,
    pub name: String,
    pub description: String,
    pub exits: Vec<Exit>,
    /// `[x, y, level]` with Y already inverted
    pub coordinates: [i32; 3],
}

impl Room {
    pub fn level(&self) -> LevelId {
        self.coordinates[2]
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    /// `[x, y, level]` with Y already inverted
    pub coordinates: [f64; 3],
    pub size: [f64; 2],
    image: String,
}

impl Label {
    /// Decoded PNG bytes, or None when the label carries no image
    pub fn image_bytes(&self) -> Result<Option<Vec<u8>>, MapError> {
        if self.image.is_empty() {
            return Ok(None);
        }
        let bytes = base64::engine::general_purpose::STANDARD.decode(&self.image)?;
        Ok(Some(bytes))
    }
}

#[derive(Debug, Clone)]
pub struct Area {
    pub id: AreaId,
    pub rooms: Vec<Room>,
    pub labels: Vec<Label>,
    /// Level id -> number of rooms on that level
    pub levels: BTreeMap<LevelId, usize>,
}

impl Area {
    /// Bounding box `[min_x, min_y, max_x, max_y]` of rooms and labels
    pub fn extent(&self) -> Option<[f64; 4]> {
        let rooms = self
            .rooms
            .iter()
            .map(|room| (room.coordinates[0] as f64, room.coordinates[1] as f64, 0.0, 0.0));
        let labels = self.labels.iter().map(|label| {
            let [x, y, _] = label.coordinates;
            (x, y, label.size[0], label.size[1])
        });

        rooms.chain(labels).fold(None, |acc, (x, y, w, h)| {
            let [min_x, min_y, max_x, max_y] = acc.unwrap_or([x, y, x + w, y + h]);
            Some([min_x.min(x), min_y.min(y), max_x.max(x + w), max_y.max(y + h)])
        })
    }
}

/// Dataset health figures reported by `check-map`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSummary {
    pub areas: usize,
    pub rooms: usize,
    pub levels: usize,
    pub labels: usize,
    pub bad_label_images: usize,
    pub one_way_exits: usize,
    pub dangling_exits: usize,
    pub duplicate_room_ids: usize,
}

/// Prepared, immutable map dataset
#[derive(Debug, Clone)]
pub struct MapData {
    areas: Vec<Area>,
    /// First room carrying each id
    rooms_by_id: HashMap<RoomId, RoomRef>,
    duplicate_room_ids: usize,
}

impl MapData {
    /// Load and prepare a dataset file
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let data = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let map = Self::from_json(&data)?;
        tracing::info!(
            "Loaded map data from {}: {} areas, {} rooms",
            path.display(),
            map.areas.len(),
            map.room_count()
        );
        Ok(map)
    }

    pub fn from_json(data: &str) -> Result<Self, MapError> {
        let file: MapFile = serde_json::from_str(data)?;
        Ok(Self::from_file(file))
    }

    /// Prepare a raw dataset. Consumes the file so the Y inversion cannot be
    /// applied twice.
    pub fn from_file(file: MapFile) -> Self {
        let mut areas = Vec::with_capacity(file.areas.len());
        let mut rooms_by_id = HashMap::new();
        let mut duplicate_room_ids = 0;

        for raw_area in file.areas {
            let area_index = areas.len();
            let area_id = raw_area.id;
            let mut levels: BTreeMap<LevelId, usize> = BTreeMap::new();

            let rooms: Vec<Room> = raw_area
                .rooms
                .into_iter()
                .map(|raw| {
                    let [x, y, level] = raw.coordinates;
                    Room {
                        id: raw.id,
                        area_id,
                        name: raw.name,
                        description: raw.user_data.description,
                        exits: raw.exits,
                        coordinates: [x, -y, level],
                    }
                })
                .collect();

            for (room_index, room) in rooms.iter().enumerate() {
                match rooms_by_id.entry(room.id) {
                    Entry::Vacant(slot) => {
                        slot.insert((area_index, room_index));
                    }
                    Entry::Occupied(_) => {
                        tracing::warn!("Duplicate room id {} in area {}", room.id, area_id);
                        duplicate_room_ids += 1;
                    }
                }
                *levels.entry(room.level()).or_default() += 1;
            }

            let labels = raw_area
                .labels
                .into_iter()
                .map(|raw| {
                    let [x, y, level] = raw.coordinates;
                    Label {
                        coordinates: [x, -y, level],
                        size: raw.size,
                        image: raw.image.concat(),
                    }
                })
                .collect();

            areas.push(Area {
                id: area_id,
                rooms,
                labels,
                levels,
            });
        }

        MapData {
            areas,
            rooms_by_id,
            duplicate_room_ids,
        }
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Every room with its position, area by area, in dataset order
    pub fn rooms(&self) -> impl Iterator<Item = (RoomRef, &Room)> {
        self.areas.iter().enumerate().flat_map(|(area_index, area)| {
            area.rooms
                .iter()
                .enumerate()
                .map(move |(room_index, room)| ((area_index, room_index), room))
        })
    }

    pub fn room_count(&self) -> usize {
        self.areas.iter().map(|area| area.rooms.len()).sum()
    }

    pub fn room_at(&self, (area_index, room_index): RoomRef) -> Option<&Room> {
        self.areas.get(area_index)?.rooms.get(room_index)
    }

    /// First room in the dataset with this id
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.room_at(*self.rooms_by_id.get(&id)?)
    }

    /// Whether the exit target links back to `room` (false for one-way exits)
    pub fn is_two_way(&self, room: &Room, exit: &Exit) -> bool {
        self.room(exit.exit_id)
            .map(|target| target.exits.iter().any(|e| e.exit_id == room.id))
            .unwrap_or(false)
    }

    pub fn summary(&self) -> MapSummary {
        let mut summary = MapSummary {
            areas: self.areas.len(),
            rooms: self.room_count(),
            duplicate_room_ids: self.duplicate_room_ids,
            ..MapSummary::default()
        };

        for area in &self.areas {
            summary.levels += area.levels.len();
            summary.labels += area.labels.len();
            for label in &area.labels {
                if let Err(e) = label.image_bytes() {
                    tracing::debug!("Label in area {} has a bad image: {}", area.id, e);
                    summary.bad_label_images += 1;
                }
            }
            for room in &area.rooms {
                for exit in &room.exits {
                    if self.room(exit.exit_id).is_none() {
                        summary.dangling_exits += 1;
                    } else if !self.is_two_way(room, exit) {
                        summary.one_way_exits += 1;
                    }
                }
            }
        }

        summary
    }
}
