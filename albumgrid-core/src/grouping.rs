//! Maps a track's metadata to the group it belongs to, and a group to its sort key.
use std::path::Path;

use albumgrid_state::{Group, GroupKey, GroupingMode, SortKey, SortMode, TrackMetadata};

use crate::titleformat::TitleFormatter;

pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_FOLDER: &str = "Unknown Folder";
pub const UNKNOWN_YEAR: &str = "Unknown Year";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const UNKNOWN: &str = "Unknown";

/// Joins the artist and album of an album key. A control character, so artist and
/// album text containing separators like " - " cannot produce the same key.
pub const ALBUM_KEY_SEPARATOR: char = '\u{1f}';

const MB: u64 = 1024 * 1024;

/// Upper bounds (exclusive) of the file size buckets and their labels.
const SIZE_BUCKETS: [(u64, &str); 5] = [
    (MB, "< 1 MB"),
    (5 * MB, "1-5 MB"),
    (10 * MB, "5-10 MB"),
    (50 * MB, "10-50 MB"),
    (100 * MB, "50-100 MB"),
];
const SIZE_BUCKET_LAST: &str = "100 MB+";

/// Upper bounds (inclusive) of the play count buckets and their labels.
const PLAY_COUNT_BUCKETS: [(u64, &str); 5] = [
    (0, "Never played"),
    (5, "1-5 plays"),
    (20, "6-20 plays"),
    (50, "21-50 plays"),
    (100, "51-100 plays"),
];
const PLAY_COUNT_BUCKET_LAST: &str = "100+ plays";

/// The grouping identity of a track, along with how its group should be labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedKey {
    pub key: GroupKey,
    pub title: String,
    pub subtitle: String,
}
impl ExtractedKey {
    fn simple(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            key: GroupKey::new(&key),
            title: key,
            subtitle: String::new(),
        }
    }
}

/// Computes group keys for one grouping mode.
///
/// Pure and deterministic: the same metadata always yields the same key, and the key is
/// never empty.
pub struct KeyExtractor<'a> {
    mode: GroupingMode,
    pattern: &'a str,
    formatter: &'a dyn TitleFormatter,
}
impl<'a> KeyExtractor<'a> {
    pub fn new(mode: GroupingMode, pattern: &'a str, formatter: &'a dyn TitleFormatter) -> Self {
        Self {
            mode,
            pattern,
            formatter,
        }
    }

    pub fn mode(&self) -> GroupingMode {
        self.mode
    }

    /// Extracts the key for a track. Tracks without metadata get the mode's fallback key.
    pub fn extract(&self, track: Option<&TrackMetadata>) -> ExtractedKey {
        let empty;
        let track = match track {
            Some(track) => track,
            None => {
                empty = TrackMetadata::default();
                &empty
            }
        };

        let text = |field: &Option<String>, fallback: &str| {
            TrackMetadata::text(field).unwrap_or(fallback).to_string()
        };

        match self.mode {
            GroupingMode::Folder => {
                let parent = track.path.parent();
                let name = parent
                    .and_then(Path::file_name)
                    .and_then(|name| name.to_str())
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(UNKNOWN_FOLDER);
                ExtractedKey {
                    key: GroupKey::new(name),
                    title: name.to_string(),
                    subtitle: parent.map(|p| p.display().to_string()).unwrap_or_default(),
                }
            }
            GroupingMode::Album => {
                let artist = track.effective_album_artist().unwrap_or(UNKNOWN_ARTIST);
                let album = text(&track.album, UNKNOWN_ALBUM);
                ExtractedKey {
                    key: GroupKey::new(format!("{artist}{ALBUM_KEY_SEPARATOR}{album}")),
                    title: album,
                    subtitle: artist.to_string(),
                }
            }
            GroupingMode::Artist => ExtractedKey::simple(text(&track.artist, UNKNOWN_ARTIST)),
            GroupingMode::AlbumArtist => {
                ExtractedKey::simple(track.effective_album_artist().unwrap_or(UNKNOWN_ARTIST))
            }
            GroupingMode::Year => ExtractedKey::simple(
                track
                    .year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            ),
            GroupingMode::Genre => ExtractedKey::simple(text(&track.genre, UNKNOWN_GENRE)),
            GroupingMode::DateModified => ExtractedKey::simple(day_label(track.date_modified)),
            GroupingMode::DateAdded => ExtractedKey::simple(day_label(track.date_added)),
            GroupingMode::FileSize => ExtractedKey::simple(size_bucket(track.size)),
            GroupingMode::Rating => ExtractedKey::simple(match track.rating {
                Some(1) => "1 star".to_string(),
                Some(r) if r > 0 => format!("{} stars", r.min(5)),
                _ => "Unrated".to_string(),
            }),
            GroupingMode::PlayCount => {
                ExtractedKey::simple(play_count_bucket(track.play_count.unwrap_or(0)))
            }
            GroupingMode::Custom => match self.formatter.evaluate(track, self.pattern) {
                Ok(key) => ExtractedKey::simple(key),
                Err(e) => {
                    tracing::debug!(
                        "Custom grouping pattern `{}` failed for {}: {e}",
                        self.pattern,
                        track.path.display()
                    );
                    ExtractedKey::simple(UNKNOWN)
                }
            },
        }
    }
}

/// Computes the sort key of a group from its representative metadata and aggregates.
pub fn sort_key(
    mode: SortMode,
    group: &Group,
    pattern: &str,
    formatter: &dyn TitleFormatter,
) -> SortKey {
    let text = |value: Option<&str>| match value {
        Some(s) if !s.is_empty() => SortKey::Text(s.to_string()),
        _ => SortKey::Missing,
    };
    let number = |value: Option<i64>| value.map_or(SortKey::Missing, SortKey::Number);
    let representative = group.representative.as_ref();

    match mode {
        SortMode::Title => text(Some(group.display_title.as_str())),
        SortMode::Artist => text(representative.and_then(|t| TrackMetadata::text(&t.artist))),
        SortMode::Album => text(representative.and_then(|t| TrackMetadata::text(&t.album))),
        SortMode::AlbumArtist => text(representative.and_then(|t| t.effective_album_artist())),
        SortMode::Year => number(representative.and_then(|t| t.year).map(i64::from)),
        SortMode::Genre => text(representative.and_then(|t| TrackMetadata::text(&t.genre))),
        SortMode::DateModified => number(representative.and_then(|t| t.date_modified)),
        SortMode::DateAdded => number(representative.and_then(|t| t.date_added)),
        SortMode::Size => SortKey::Number(saturating_i64(group.aggregate_size)),
        SortMode::TrackCount => SortKey::Number(saturating_i64(group.track_count as u64)),
        SortMode::Rating => number(
            representative
                .and_then(|t| t.rating)
                .filter(|r| *r > 0)
                .map(i64::from),
        ),
        SortMode::PlayCount => SortKey::Number(saturating_i64(group.total_play_count)),
        SortMode::Path => text(representative.and_then(|t| t.path.to_str())),
        SortMode::Custom => match representative.map(|t| formatter.evaluate(t, pattern)) {
            Some(Ok(key)) => SortKey::Text(key),
            Some(Err(e)) => {
                tracing::debug!("Custom sort pattern `{pattern}` failed for {}: {e}", group.key);
                SortKey::Missing
            }
            None => SortKey::Missing,
        },
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn day_label(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

fn size_bucket(size: u64) -> &'static str {
    SIZE_BUCKETS
        .iter()
        .find(|(limit, _)| size < *limit)
        .map_or(SIZE_BUCKET_LAST, |(_, label)| *label)
}

fn play_count_bucket(count: u64) -> &'static str {
    PLAY_COUNT_BUCKETS
        .iter()
        .find(|(limit, _)| count <= *limit)
        .map_or(PLAY_COUNT_BUCKET_LAST, |(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::titleformat::PatternFormatter;
    use albumgrid_state::TrackId;

    fn track() -> TrackMetadata {
        TrackMetadata {
            title: Some("Come Together".to_string()),
            artist: Some("The Beatles".to_string()),
            album: Some("Abbey Road".to_string()),
            genre: Some("Rock".to_string()),
            year: Some(1969),
            rating: Some(4),
            play_count: Some(12),
            date_added: Some(1_700_000_000),
            ..TrackMetadata::new("/music/The Beatles/Abbey Road/01.flac", 30 * MB)
        }
    }

    fn key(mode: GroupingMode, track: Option<&TrackMetadata>) -> String {
        let formatter = PatternFormatter::default();
        KeyExtractor::new(mode, "%genre% / %year%", &formatter)
            .extract(track)
            .key
            .to_string()
    }

    #[test]
    fn test_keys_per_mode() {
        let t = track();
        assert_eq!(key(GroupingMode::Folder, Some(&t)), "Abbey Road");
        assert_eq!(key(GroupingMode::Album, Some(&t)), "The Beatles\u{1f}Abbey Road");
        assert_eq!(key(GroupingMode::Artist, Some(&t)), "The Beatles");
        assert_eq!(key(GroupingMode::AlbumArtist, Some(&t)), "The Beatles");
        assert_eq!(key(GroupingMode::Year, Some(&t)), "1969");
        assert_eq!(key(GroupingMode::Genre, Some(&t)), "Rock");
        assert_eq!(key(GroupingMode::DateAdded, Some(&t)), "2023-11-14");
        assert_eq!(key(GroupingMode::DateModified, Some(&t)), UNKNOWN_DATE);
        assert_eq!(key(GroupingMode::FileSize, Some(&t)), "10-50 MB");
        assert_eq!(key(GroupingMode::Rating, Some(&t)), "4 stars");
        assert_eq!(key(GroupingMode::PlayCount, Some(&t)), "6-20 plays");
        assert_eq!(key(GroupingMode::Custom, Some(&t)), "Rock / 1969");
    }

    #[test]
    fn test_album_keys_do_not_collide_on_separator_text() {
        let a = TrackMetadata {
            artist: Some("A - B".to_string()),
            album: Some("C".to_string()),
            ..TrackMetadata::new("/music/1.flac", 1)
        };
        let b = TrackMetadata {
            artist: Some("A".to_string()),
            album: Some("B - C".to_string()),
            ..TrackMetadata::new("/music/2.flac", 1)
        };
        assert_ne!(key(GroupingMode::Album, Some(&a)), key(GroupingMode::Album, Some(&b)));

        let formatter = PatternFormatter::default();
        let extractor = KeyExtractor::new(GroupingMode::Album, "", &formatter);
        let tracks = [(TrackId::new("1"), Some(a)), (TrackId::new("2"), Some(b))];
        let groups = crate::aggregate::aggregate(tracks, &extractor);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].display_title, "C");
        assert_eq!(groups[0].display_subtitle, "A - B");
        assert_eq!(groups[1].display_title, "B - C");
        assert_eq!(groups[1].display_subtitle, "A");
    }

    #[test]
    fn test_folder_key_ignores_library_root() {
        let a = TrackMetadata::new("C:/Music/Abbey Road/01.flac", 1);
        let b = TrackMetadata::new("/mnt/other/Abbey Road/02.flac", 1);
        assert_eq!(key(GroupingMode::Folder, Some(&a)), key(GroupingMode::Folder, Some(&b)));
    }

    #[test]
    fn test_fallbacks_are_never_empty() {
        let blank = TrackMetadata {
            artist: Some("   ".to_string()),
            ..TrackMetadata::default()
        };
        for mode in GroupingMode::ALL {
            for track in [None, Some(&blank)] {
                let k = key(mode, track);
                assert!(!k.is_empty(), "{mode} produced an empty key");
            }
        }
        assert_eq!(key(GroupingMode::Artist, Some(&blank)), UNKNOWN_ARTIST);
        assert_eq!(key(GroupingMode::Folder, None), UNKNOWN_FOLDER);
        assert_eq!(
            key(GroupingMode::Album, None),
            format!("{UNKNOWN_ARTIST}{ALBUM_KEY_SEPARATOR}{UNKNOWN_ALBUM}")
        );
        assert_eq!(key(GroupingMode::Custom, None), UNKNOWN);
    }

    #[test]
    fn test_broken_pattern_falls_back() {
        let formatter = PatternFormatter::default();
        let extractor = KeyExtractor::new(GroupingMode::Custom, "%album", &formatter);
        assert_eq!(extractor.extract(Some(&track())).key.as_str(), UNKNOWN);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let t = track();
        for mode in GroupingMode::ALL {
            assert_eq!(key(mode, Some(&t)), key(mode, Some(&t)));
        }
    }

    #[test]
    fn test_album_artist_preferred_over_artist() {
        let t = TrackMetadata {
            album_artist: Some("Various Artists".to_string()),
            ..track()
        };
        assert_eq!(key(GroupingMode::AlbumArtist, Some(&t)), "Various Artists");
        assert_eq!(key(GroupingMode::Artist, Some(&t)), "The Beatles");
    }

    #[test]
    fn test_buckets() {
        assert_eq!(size_bucket(0), "< 1 MB");
        assert_eq!(size_bucket(MB), "1-5 MB");
        assert_eq!(size_bucket(200 * MB), SIZE_BUCKET_LAST);
        assert_eq!(play_count_bucket(0), "Never played");
        assert_eq!(play_count_bucket(5), "1-5 plays");
        assert_eq!(play_count_bucket(101), PLAY_COUNT_BUCKET_LAST);
    }
}
