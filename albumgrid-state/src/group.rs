use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{SortKey, TrackId, TrackMetadata};

/// The identity of a group within one snapshot. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(pub SmolStr);
impl GroupKey {
    /// Creates a group key from anything string-like.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(SmolStr::new(key))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A grouping of tracks, shown as one cell of the grid.
///
/// Groups are built once per refresh and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Group {
    /// The grouping identity.
    pub key: GroupKey,
    /// The heading of the cell.
    pub display_title: String,
    /// The subheading of the cell; may be empty.
    pub display_subtitle: String,
    /// The key used to order this group under the active sort mode.
    pub sort_key: SortKey,
    /// The tracks in the group, in the order they were folded in.
    pub tracks: Vec<TrackId>,
    /// The metadata of the track that seeded this group, if it had any.
    pub representative: Option<TrackMetadata>,
    /// The number of tracks in the group.
    pub track_count: usize,
    /// The total file size of the group in bytes.
    pub aggregate_size: u64,
    /// The total duration of the group in seconds.
    pub total_duration: u64,
    /// The total play count of the group.
    pub total_play_count: u64,
    /// Lowercased key, title and subtitle, for filtering.
    pub search_text: String,
}
impl Group {
    /// Whether this group contains the given track.
    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.tracks.contains(track_id)
    }
}
