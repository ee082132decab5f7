use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use albumgrid_core::state::{TrackId, TrackMetadata};
use anyhow::{Context as _, Result};
use lofty::{
    file::{AudioFile as _, TaggedFileExt as _},
    read_from_path,
};
use walkdir::WalkDir;

const MUSIC_EXTENSIONS: [&str; 9] = [
    "mp3", "flac", "m4a", "aac", "ogg", "opus", "wav", "wma", "mp4",
];

/// Finds every music file under `directory` and reads its tags.
///
/// Files whose tags can't be read are still returned, with only their file metadata.
pub fn scan(directory: &Path) -> Result<Vec<(TrackId, Option<TrackMetadata>)>> {
    anyhow::ensure!(
        directory.is_dir(),
        "'{}' is not a directory",
        directory.display()
    );

    let mut tracks = vec![];
    for entry in WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !is_music_file(path) {
            continue;
        }
        let id = TrackId::new(path.to_string_lossy());
        let metadata = match read_file_metadata(path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!("{e:?}");
                None
            }
        };
        tracks.push((id, metadata));
    }
    tracing::info!(
        "Found {} music files in {}",
        tracks.len(),
        directory.display()
    );
    Ok(tracks)
}

fn is_music_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MUSIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn read_file_metadata(path: &Path) -> Result<TrackMetadata> {
    let file_metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let mut metadata = TrackMetadata {
        date_modified: file_metadata.modified().ok().and_then(unix_seconds),
        date_added: file_metadata.created().ok().and_then(unix_seconds),
        ..TrackMetadata::new(path, file_metadata.len())
    };
    if let Err(e) = read_tags(path, &mut metadata) {
        // Untagged files still belong in the grid.
        tracing::debug!("{e:?}");
    }
    Ok(metadata)
}

fn read_tags(path: &Path, metadata: &mut TrackMetadata) -> Result<()> {
    let tagged_file = read_from_path(path)
        .with_context(|| format!("Failed to read tags from {}", path.display()))?;
    let duration = tagged_file.properties().duration().as_secs();
    if duration > 0 {
        metadata.duration = u32::try_from(duration).ok();
    }

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .with_context(|| format!("No tags found in {}", path.display()))?;

    for item in tag.items() {
        let key = format!("{:?}", item.key()).to_lowercase();
        let value = item.value().text().unwrap_or("").trim();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "tracktitle" => metadata.title = Some(value.to_string()),
            "trackartist" => metadata.artist = Some(value.to_string()),
            "albumartist" => metadata.album_artist = Some(value.to_string()),
            "albumtitle" => metadata.album = Some(value.to_string()),
            "genre" => metadata.genre = Some(value.to_string()),
            "year" | "recordingdate" | "originalreleasedate" if metadata.year.is_none() => {
                metadata.year = parse_year(value);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Reads the year from dates like `1969`, `1969-09-26` or `1969/09`.
fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4).then(|| digits.parse().ok()).flatten()
}

fn unix_seconds(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("1969"), Some(1969));
        assert_eq!(parse_year("1969-09-26"), Some(1969));
        assert_eq!(parse_year("1969/09"), Some(1969));
        assert_eq!(parse_year("69"), None);
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn test_is_music_file() {
        assert!(is_music_file(Path::new("/music/a.flac")));
        assert!(is_music_file(Path::new("/music/B.MP3")));
        assert!(!is_music_file(Path::new("/music/cover.jpg")));
        assert!(!is_music_file(Path::new("/music/README")));
    }

    #[test]
    fn test_untagged_files_are_kept() {
        let dir = std::env::temp_dir().join(format!("albumgrid-scan-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("Some Album")).unwrap();
        std::fs::write(dir.join("Some Album/01.mp3"), b"not really an mp3").unwrap();
        std::fs::write(dir.join("Some Album/cover.jpg"), b"").unwrap();

        let tracks = scan(&dir).unwrap();
        assert_eq!(tracks.len(), 1);
        let metadata = tracks[0].1.as_ref().unwrap();
        assert_eq!(metadata.size, 17);
        assert_eq!(metadata.title, None);
        assert!(metadata.date_modified.is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(scan(Path::new("/definitely/not/a/real/directory")).is_err());
    }
}
