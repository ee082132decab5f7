use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// An opaque track identifier, owned by the library that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub SmolStr);
impl TrackId {
    /// Creates a track ID from anything string-like.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }
}
impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The metadata of a track, as the grid cares about it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// The path of the media file
    pub path: PathBuf,
    /// The track title
    pub title: Option<String>,
    /// The track artist
    pub artist: Option<String>,
    /// The album artist
    pub album_artist: Option<String>,
    /// The album name
    pub album: Option<String>,
    /// The genre
    pub genre: Option<String>,
    /// The release year
    pub year: Option<i32>,
    /// The file size in bytes
    pub size: u64,
    /// The duration in seconds
    pub duration: Option<u32>,
    /// The rating, from 1 to 5; `None` or 0 means unrated
    pub rating: Option<u8>,
    /// The number of times this track has been played
    pub play_count: Option<u64>,
    /// Last modification time of the file, in unix seconds
    pub date_modified: Option<i64>,
    /// Time the track was added to the library, in unix seconds
    pub date_added: Option<i64>,
}
impl TrackMetadata {
    /// Creates metadata for a file with nothing but a path and size.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            ..Default::default()
        }
    }

    /// Returns the given text field if it has non-whitespace content.
    pub fn text(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The album artist, falling back to the track artist.
    pub fn effective_album_artist(&self) -> Option<&str> {
        Self::text(&self.album_artist).or_else(|| Self::text(&self.artist))
    }
}
