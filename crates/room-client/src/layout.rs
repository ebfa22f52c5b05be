//! Participant tile layout.
//!
//! A pure function from the participant list to a tile arrangement:
//!
//! | Participants | Layout                                   |
//! |--------------|------------------------------------------|
//! | 0            | `Empty`, no tiles                        |
//! | 1            | `Single`, one full-area tile             |
//! | 2            | `Pair`, stacked vertically, equal height |
//! | 3 or more    | `Grid`, 2x2 of the first four            |
//!
//! Participants past the fourth are not rendered; `hidden_count` says how
//! many. Order is the order given, never re-sorted by speaker.

/// Most tiles ever rendered.
pub const MAX_VISIBLE_TILES: usize = 4;

/// One participant as the layout sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTrack {
    pub participant_identity: String,
    pub participant_name: String,
    pub has_video: bool,
    pub is_speaking: bool,
}

impl ParticipantTrack {
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            participant_identity: identity.into(),
            participant_name: name.into(),
            has_video: false,
            is_speaking: false,
        }
    }

    /// Name shown on the tile: the display name, or the identity when the
    /// participant has none.
    pub fn display_name(&self) -> &str {
        if self.participant_name.is_empty() {
            &self.participant_identity
        } else {
            &self.participant_name
        }
    }
}

/// Layout bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Empty,
    Single,
    Pair,
    Grid,
}

/// What a tile renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileContent {
    /// The participant's camera video.
    Video,
    /// The participant's name, shown when there is no video.
    NamePlaceholder,
}

/// Tile position as fractions of the video area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TileRect {
    const FULL: TileRect = TileRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

/// One rendered participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub identity: String,
    pub display_name: String,
    pub is_speaking: bool,
    pub content: TileContent,
    pub rect: TileRect,
}

/// A complete arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub kind: LayoutKind,
    pub tiles: Vec<Tile>,
    /// Participants left out of the grid.
    pub hidden_count: usize,
}

impl Layout {
    /// The arrangement for no participants.
    pub fn empty() -> Self {
        Self {
            kind: LayoutKind::Empty,
            tiles: Vec::new(),
            hidden_count: 0,
        }
    }
}

/// Arrange `tracks` into tiles.
pub fn arrange(tracks: &[ParticipantTrack]) -> Layout {
    let kind = match tracks.len() {
        0 => LayoutKind::Empty,
        1 => LayoutKind::Single,
        2 => LayoutKind::Pair,
        _ => LayoutKind::Grid,
    };

    let tiles = tracks
        .iter()
        .take(MAX_VISIBLE_TILES)
        .enumerate()
        .map(|(slot, track)| Tile {
            identity: track.participant_identity.clone(),
            display_name: track.display_name().to_string(),
            is_speaking: track.is_speaking,
            content: if track.has_video {
                TileContent::Video
            } else {
                TileContent::NamePlaceholder
            },
            rect: slot_rect(kind, slot),
        })
        .collect();

    Layout {
        kind,
        tiles,
        hidden_count: tracks.len().saturating_sub(MAX_VISIBLE_TILES),
    }
}

fn slot_rect(kind: LayoutKind, slot: usize) -> TileRect {
    match kind {
        LayoutKind::Empty | LayoutKind::Single => TileRect::FULL,
        LayoutKind::Pair => TileRect {
            x: 0.0,
            y: if slot == 0 { 0.0 } else { 0.5 },
            width: 1.0,
            height: 0.5,
        },
        LayoutKind::Grid => TileRect {
            x: if slot % 2 == 0 { 0.0 } else { 0.5 },
            y: if slot < 2 { 0.0 } else { 0.5 },
            width: 0.5,
            height: 0.5,
        },
    }
}
