//! Decoding album artwork into thumbnails.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use albumgrid_state::{GroupKey, TrackMetadata};

/// A decoded RGBA8 bitmap.
#[derive(Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// The edge length that was requested when this thumbnail was decoded.
    pub edge: u32,
    pub rgba: Arc<[u8]>,
}
impl Thumbnail {
    /// The memory this thumbnail occupies, for cache accounting.
    pub fn byte_size(&self) -> usize {
        self.rgba.len()
    }
}
impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("edge", &self.edge)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

#[derive(Debug)]
/// An error that can occur when producing a thumbnail.
pub enum ThumbnailError {
    /// No artwork could be found for the group.
    NoArtwork,
    /// The artwork could not be read.
    Io(std::io::Error),
    /// The artwork could not be decoded.
    Decode(image::ImageError),
}
impl std::fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThumbnailError::NoArtwork => write!(f, "no artwork available"),
            ThumbnailError::Io(e) => write!(f, "failed to read artwork: {e}"),
            ThumbnailError::Decode(e) => write!(f, "failed to decode artwork: {e}"),
        }
    }
}
impl std::error::Error for ThumbnailError {}
impl From<std::io::Error> for ThumbnailError {
    fn from(e: std::io::Error) -> Self {
        ThumbnailError::Io(e)
    }
}
impl From<image::ImageError> for ThumbnailError {
    fn from(e: image::ImageError) -> Self {
        ThumbnailError::Decode(e)
    }
}

/// What a loader worker needs to produce one thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub key: GroupKey,
    /// The group's representative track.
    pub track: Option<TrackMetadata>,
    /// The target edge length in pixels.
    pub edge: u32,
}

/// Produces thumbnails. Called on loader threads, so it may block.
pub trait ThumbnailProvider: Send + Sync {
    fn load(&self, request: &ThumbnailRequest) -> Result<Thumbnail, ThumbnailError>;
}

/// Finds the raw (encoded) artwork bytes for a track.
pub trait ArtSource: Send + Sync {
    fn art_bytes(&self, track: &TrackMetadata) -> Result<Vec<u8>, ThumbnailError>;
}

/// Looks for the usual cover image files next to the track.
#[derive(Debug, Clone, Default)]
pub struct SidecarArtSource;
impl SidecarArtSource {
    const STEMS: [&'static str; 4] = ["cover", "folder", "front", "album"];
    const EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "webp"];

    pub fn find(directory: &Path) -> Option<PathBuf> {
        Self::STEMS
            .iter()
            .flat_map(|stem| {
                Self::EXTENSIONS
                    .iter()
                    .map(move |ext| directory.join(format!("{stem}.{ext}")))
            })
            .find(|path| path.is_file())
    }
}
impl ArtSource for SidecarArtSource {
    fn art_bytes(&self, track: &TrackMetadata) -> Result<Vec<u8>, ThumbnailError> {
        let path = track
            .path
            .parent()
            .and_then(Self::find)
            .ok_or(ThumbnailError::NoArtwork)?;
        Ok(std::fs::read(path)?)
    }
}

/// Decodes artwork with the `image` crate and scales it to fit the requested edge.
pub struct ImageThumbnailer<A: ArtSource> {
    source: A,
}
impl<A: ArtSource> ImageThumbnailer<A> {
    pub fn new(source: A) -> Self {
        Self { source }
    }

    /// Decodes encoded image bytes into a thumbnail no larger than `edge` on either side.
    pub fn decode(data: &[u8], edge: u32) -> Result<Thumbnail, ThumbnailError> {
        let img = image::load_from_memory(data)?;
        let edge = edge.max(1);
        let resized = if img.width() > edge || img.height() > edge {
            img.resize(edge, edge, image::imageops::FilterType::Triangle)
        } else {
            img
        };
        let rgba = resized.into_rgba8();
        Ok(Thumbnail {
            width: rgba.width(),
            height: rgba.height(),
            edge,
            rgba: rgba.into_raw().into(),
        })
    }
}
impl<A: ArtSource> ThumbnailProvider for ImageThumbnailer<A> {
    fn load(&self, request: &ThumbnailRequest) -> Result<Thumbnail, ThumbnailError> {
        let track = request.track.as_ref().ok_or(ThumbnailError::NoArtwork)?;
        let data = self.source.art_bytes(track)?;
        let thumbnail = Self::decode(&data, request.edge)?;
        tracing::debug!(
            "Decoded {}x{} thumbnail for {}",
            thumbnail.width,
            thumbnail.height,
            request.key
        );
        Ok(thumbnail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut buffer = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_scales_preserving_aspect() {
        let thumbnail = ImageThumbnailer::<SidecarArtSource>::decode(&png(200, 100), 50).unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (50, 25));
        assert_eq!(thumbnail.byte_size(), 50 * 25 * 4);
        assert_eq!(thumbnail.edge, 50);
    }

    #[test]
    fn test_decode_does_not_upscale() {
        let thumbnail = ImageThumbnailer::<SidecarArtSource>::decode(&png(10, 10), 50).unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (10, 10));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            ImageThumbnailer::<SidecarArtSource>::decode(b"definitely not an image", 50),
            Err(ThumbnailError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_track_is_no_artwork() {
        let thumbnailer = ImageThumbnailer::new(SidecarArtSource);
        let request = ThumbnailRequest {
            key: GroupKey::new("k"),
            track: None,
            edge: 64,
        };
        assert!(matches!(
            thumbnailer.load(&request),
            Err(ThumbnailError::NoArtwork)
        ));
    }

    #[test]
    fn test_sidecar_lookup() {
        let dir = std::env::temp_dir().join(format!("albumgrid-sidecar-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("folder.png"), png(4, 4)).unwrap();

        let track = TrackMetadata::new(dir.join("01.flac"), 1);
        let thumbnailer = ImageThumbnailer::new(SidecarArtSource);
        let thumbnail = thumbnailer
            .load(&ThumbnailRequest {
                key: GroupKey::new("k"),
                track: Some(track),
                edge: 64,
            })
            .unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (4, 4));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
