use serde::{Deserialize, Serialize};

/// The metadata dimension tracks are clustered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// The immediate parent directory of the file.
    Folder,
    /// Album artist and album name.
    #[default]
    Album,
    /// Track artist.
    Artist,
    /// Album artist, falling back to the track artist.
    AlbumArtist,
    /// Release year.
    Year,
    /// Genre.
    Genre,
    /// Day the file was last modified.
    DateModified,
    /// Day the track was added to the library.
    DateAdded,
    /// Coarse file size bucket.
    FileSize,
    /// Star rating.
    Rating,
    /// Coarse play count bucket.
    PlayCount,
    /// A user-supplied title-formatting pattern.
    Custom,
}
impl GroupingMode {
    /// All grouping modes, in menu order.
    pub const ALL: [GroupingMode; 12] = [
        GroupingMode::Folder,
        GroupingMode::Album,
        GroupingMode::Artist,
        GroupingMode::AlbumArtist,
        GroupingMode::Year,
        GroupingMode::Genre,
        GroupingMode::DateModified,
        GroupingMode::DateAdded,
        GroupingMode::FileSize,
        GroupingMode::Rating,
        GroupingMode::PlayCount,
        GroupingMode::Custom,
    ];

    /// The identifier used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::Folder => "folder",
            GroupingMode::Album => "album",
            GroupingMode::Artist => "artist",
            GroupingMode::AlbumArtist => "album_artist",
            GroupingMode::Year => "year",
            GroupingMode::Genre => "genre",
            GroupingMode::DateModified => "date_modified",
            GroupingMode::DateAdded => "date_added",
            GroupingMode::FileSize => "file_size",
            GroupingMode::Rating => "rating",
            GroupingMode::PlayCount => "play_count",
            GroupingMode::Custom => "custom",
        }
    }
}
impl std::fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl std::str::FromStr for GroupingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// The key groups are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// The group's display title.
    #[default]
    Title,
    /// Artist of the representative track.
    Artist,
    /// Album of the representative track.
    Album,
    /// Album artist of the representative track.
    AlbumArtist,
    /// Release year of the representative track.
    Year,
    /// Genre of the representative track.
    Genre,
    /// Modification time of the representative track.
    DateModified,
    /// Library addition time of the representative track.
    DateAdded,
    /// Total size of the group.
    Size,
    /// Number of tracks in the group.
    TrackCount,
    /// Rating of the representative track.
    Rating,
    /// Total play count of the group.
    PlayCount,
    /// Path of the representative track.
    Path,
    /// A user-supplied title-formatting pattern, evaluated on the representative track.
    Custom,
}
impl SortMode {
    /// All sort modes, in menu order.
    pub const ALL: [SortMode; 14] = [
        SortMode::Title,
        SortMode::Artist,
        SortMode::Album,
        SortMode::AlbumArtist,
        SortMode::Year,
        SortMode::Genre,
        SortMode::DateModified,
        SortMode::DateAdded,
        SortMode::Size,
        SortMode::TrackCount,
        SortMode::Rating,
        SortMode::PlayCount,
        SortMode::Path,
        SortMode::Custom,
    ];

    /// The identifier used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Title => "title",
            SortMode::Artist => "artist",
            SortMode::Album => "album",
            SortMode::AlbumArtist => "album_artist",
            SortMode::Year => "year",
            SortMode::Genre => "genre",
            SortMode::DateModified => "date_modified",
            SortMode::DateAdded => "date_added",
            SortMode::Size => "size",
            SortMode::TrackCount => "track_count",
            SortMode::Rating => "rating",
            SortMode::PlayCount => "play_count",
            SortMode::Path => "path",
            SortMode::Custom => "custom",
        }
    }
}
impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl std::str::FromStr for SortMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// Returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(pub String);
impl std::fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown mode `{}`", self.0)
    }
}
impl std::error::Error for ParseModeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("album-artist".parse(), Ok(GroupingMode::AlbumArtist));
        assert_eq!(" Date_Added ".parse(), Ok(GroupingMode::DateAdded));
        assert_eq!("track-count".parse(), Ok(SortMode::TrackCount));
        assert_eq!(
            "track_count".parse::<GroupingMode>(),
            Err(ParseModeError("track_count".to_string()))
        );
        for mode in GroupingMode::ALL {
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
        for mode in SortMode::ALL {
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
    }
}
