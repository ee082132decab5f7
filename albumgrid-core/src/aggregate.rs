//! Folds a track collection into groups.
use std::collections::HashMap;

use albumgrid_state::{Group, GroupKey, SortKey, SortMode, TrackId, TrackMetadata};

use crate::{
    grouping::{self, KeyExtractor},
    titleformat::TitleFormatter,
};

/// Builds the group list in a single pass.
///
/// Groups appear in the order their first track was seen, and are seeded from that
/// track's metadata; later tracks never change a group's labels. Tracks without
/// metadata are kept under the fallback key, so the sum of `track_count` over the
/// result always equals the number of input tracks.
pub fn aggregate(
    tracks: impl IntoIterator<Item = (TrackId, Option<TrackMetadata>)>,
    extractor: &KeyExtractor,
) -> Vec<Group> {
    let mut groups: Vec<Group> = vec![];
    let mut group_index: HashMap<GroupKey, usize> = HashMap::new();

    for (track_id, metadata) in tracks {
        let extracted = extractor.extract(metadata.as_ref());
        let index = match group_index.get(&extracted.key) {
            Some(index) => *index,
            None => {
                let search_text = format!(
                    "{}\n{}\n{}",
                    extracted.key, extracted.title, extracted.subtitle
                )
                .to_lowercase();
                groups.push(Group {
                    key: extracted.key.clone(),
                    display_title: extracted.title,
                    display_subtitle: extracted.subtitle,
                    sort_key: SortKey::Missing,
                    tracks: vec![],
                    representative: metadata.clone(),
                    track_count: 0,
                    aggregate_size: 0,
                    total_duration: 0,
                    total_play_count: 0,
                    search_text,
                });
                group_index.insert(extracted.key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.tracks.push(track_id);
        group.track_count += 1;
        if let Some(metadata) = &metadata {
            group.aggregate_size += metadata.size;
            group.total_duration += u64::from(metadata.duration.unwrap_or(0));
            group.total_play_count += metadata.play_count.unwrap_or(0);
        }
    }

    tracing::debug!(
        "Aggregated tracks into {} groups by {}",
        groups.len(),
        extractor.mode()
    );
    groups
}

/// Fills in each group's sort key for the given sort mode.
pub fn assign_sort_keys(
    groups: &mut [Group],
    mode: SortMode,
    pattern: &str,
    formatter: &dyn TitleFormatter,
) {
    for group in groups {
        group.sort_key = grouping::sort_key(mode, group, pattern, formatter);
    }
}
