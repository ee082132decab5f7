//! Scroll bar labels for the grid.
//!
//! For text sort orders the labels are initial letters (A-Z, with `#` for anything
//! else); for year and date orders they are years. Other orders get no labels.
use std::sync::Arc;

use albumgrid_state::{Group, SortKey, SortMode};

/// The label a group contributes to the scroll bar under a sort mode.
pub fn label_for(group: &Group, mode: SortMode) -> Option<String> {
    match mode {
        SortMode::Title
        | SortMode::Artist
        | SortMode::Album
        | SortMode::AlbumArtist
        | SortMode::Genre
        | SortMode::Custom => match &group.sort_key {
            SortKey::Text(s) => s.chars().next().map(|c| {
                if c.is_alphabetic() {
                    c.to_uppercase().collect()
                } else {
                    "#".to_string()
                }
            }),
            _ => None,
        },
        SortMode::Year => match group.sort_key {
            SortKey::Number(year) => Some(year.to_string()),
            _ => None,
        },
        SortMode::DateAdded | SortMode::DateModified => match group.sort_key {
            SortKey::Number(secs) => chrono::DateTime::from_timestamp(secs, 0)
                .map(|date| date.format("%Y").to_string()),
            _ => None,
        },
        SortMode::Size
        | SortMode::TrackCount
        | SortMode::Rating
        | SortMode::PlayCount
        | SortMode::Path => None,
    }
}

/// Computes scroll indicator positions as fractions of the grid's height.
///
/// Each group occupies `1 / columns` of a row, so positions are the fraction of rows
/// above the first group carrying each label. Labels closer together than
/// `cluster_threshold` are merged, keeping the one that labels the most groups.
pub fn compute_positions<'a>(
    groups: impl Iterator<Item = &'a Arc<Group>>,
    mode: SortMode,
    columns: usize,
    cluster_threshold: f32,
) -> Vec<(String, f32)> {
    let columns = columns.max(1);
    let labels: Vec<Option<String>> = groups.map(|group| label_for(group, mode)).collect();
    let total_rows = labels.len().div_ceil(columns);
    if total_rows == 0 {
        return Vec::new();
    }

    let mut label_positions: Vec<(String, f32, usize)> = Vec::new();
    let mut last_label: Option<&str> = None;
    for (index, label) in labels.iter().enumerate() {
        let Some(label) = label.as_deref() else {
            continue;
        };
        if last_label != Some(label) {
            let fraction = (index / columns) as f32 / total_rows as f32;
            label_positions.push((label.to_string(), fraction, 1));
            last_label = Some(label);
        } else if let Some(last) = label_positions.last_mut() {
            last.2 += 1;
        }
    }

    cluster_labels(label_positions, cluster_threshold)
}

/// Clusters labels that are too close together, keeping the one with highest count.
fn cluster_labels(positions: Vec<(String, f32, usize)>, threshold: f32) -> Vec<(String, f32)> {
    let mut clustered: Vec<(String, f32)> = Vec::new();
    let mut i = 0;

    while i < positions.len() {
        let mut cluster_end = i + 1;
        while cluster_end < positions.len() {
            let distance = positions[cluster_end].1 - positions[i].1;
            if distance >= threshold {
                break;
            }
            cluster_end += 1;
        }

        // Ties go to the earliest label, so the output is stable.
        let mut best = &positions[i];
        for candidate in &positions[i + 1..cluster_end] {
            if candidate.2 > best.2 {
                best = candidate;
            }
        }

        clustered.push((best.0.clone(), best.1));
        i = cluster_end;
    }

    clustered
}
