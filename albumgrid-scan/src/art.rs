use albumgrid_core::{
    state::TrackMetadata,
    thumbnail::{ArtSource, SidecarArtSource, ThumbnailError},
};
use lofty::{file::TaggedFileExt as _, picture::PictureType, read_from_path};

/// Reads artwork embedded in the track's tags, preferring the front cover, and
/// falls back to a cover image next to the file.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedArtSource {
    sidecar: SidecarArtSource,
}
impl ArtSource for EmbeddedArtSource {
    fn art_bytes(&self, track: &TrackMetadata) -> Result<Vec<u8>, ThumbnailError> {
        match embedded_picture(track) {
            Some(data) => Ok(data),
            None => self.sidecar.art_bytes(track),
        }
    }
}

fn embedded_picture(track: &TrackMetadata) -> Option<Vec<u8>> {
    let tagged_file = read_from_path(&track.path)
        .map_err(|e| tracing::debug!("Failed to read tags from {}: {e}", track.path.display()))
        .ok()?;
    let pictures = || tagged_file.tags().iter().flat_map(|tag| tag.pictures());
    pictures()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures().next())
        .map(|picture| picture.data().to_vec())
}
