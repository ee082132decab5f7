//! Orders and filters groups without touching them.
//!
//! Everything here works on index lists over the immutable group list, so a view can
//! be rebuilt (new filter, flipped direction) without rebuilding the groups.
use std::{cmp::Ordering, sync::Arc};

use albumgrid_state::Group;

/// Locale-aware text comparison: case-insensitive, accent-insensitive, with numbers
/// compared by value ("Vol. 2" before "Vol. 10").
pub struct TextCollator {
    collator: Option<icu_collator::CollatorBorrowed<'static>>,
}
impl TextCollator {
    pub fn new() -> Self {
        let mut collator_preferences = icu_collator::CollatorPreferences::default();
        collator_preferences.numeric_ordering =
            Some(icu_collator::preferences::CollationNumericOrdering::True);

        let mut collator_options = icu_collator::options::CollatorOptions::default();
        collator_options.strength = Some(icu_collator::options::Strength::Primary);
        collator_options.case_level = Some(icu_collator::options::CaseLevel::Off);

        let collator = icu_collator::Collator::try_new(collator_preferences, collator_options)
            .map_err(|e| tracing::warn!("Falling back to plain text ordering: {e}"))
            .ok();
        Self { collator }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }
}
impl Default for TextCollator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the indices of groups whose search text contains `filter`, ignoring case.
/// An empty filter matches every group.
pub fn filter_indices(groups: &[Arc<Group>], filter: &str) -> Vec<usize> {
    let filter = filter.to_lowercase();
    groups
        .iter()
        .enumerate()
        .filter(|(_, group)| filter.is_empty() || group.search_text.contains(&filter))
        .map(|(index, _)| index)
        .collect()
}

/// Stably sorts `indices` by each group's sort key.
///
/// `descending` flips the comparison rather than the output, so groups with equal keys
/// keep their original relative order in both directions.
pub fn sort_indices(
    groups: &[Arc<Group>],
    indices: &mut [usize],
    descending: bool,
    collator: &TextCollator,
) {
    indices.sort_by(|&a, &b| {
        let ordering = groups[a]
            .sort_key
            .compare_with(&groups[b].sort_key, |x, y| collator.compare(x, y));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Filters, then sorts: the display order of a snapshot.
pub fn build_view(
    groups: &[Arc<Group>],
    filter: &str,
    descending: bool,
    collator: &TextCollator,
) -> Vec<usize> {
    let mut indices = filter_indices(groups, filter);
    sort_indices(groups, &mut indices, descending, collator);
    indices
}

#[cfg(test)]
mod tests {
    use albumgrid_state::SortKey;

    use super::*;

    fn group(title: &str, subtitle: &str, sort_key: SortKey) -> Arc<Group> {
        Arc::new(Group {
            key: albumgrid_state::GroupKey::new(format!("{subtitle} - {title}")),
            display_title: title.to_string(),
            display_subtitle: subtitle.to_string(),
            sort_key,
            tracks: vec![],
            representative: None,
            track_count: 0,
            aggregate_size: 0,
            total_duration: 0,
            total_play_count: 0,
            search_text: format!("{subtitle} - {title}\n{title}\n{subtitle}").to_lowercase(),
        })
    }

    fn text(s: &str) -> SortKey {
        SortKey::Text(s.to_string())
    }

    #[test]
    fn test_filter_zeppelin() {
        let groups = vec![
            group("Led Zeppelin IV", "Led Zeppelin", text("a")),
            group("Abbey Road", "The Beatles", text("b")),
        ];
        assert_eq!(filter_indices(&groups, "zeppelin"), vec![0]);
        assert_eq!(filter_indices(&groups, "ZEPPELIN"), vec![0]);
        assert_eq!(filter_indices(&groups, "beatles"), vec![1]);
    }

    #[test]
    fn test_empty_filter_differs_from_no_match() {
        let groups = vec![
            group("B", "x", text("b")),
            group("A", "y", text("a")),
        ];
        assert_eq!(filter_indices(&groups, ""), vec![0, 1]);
        assert!(filter_indices(&groups, "nothing matches this").is_empty());
    }

    #[test]
    fn test_filter_matches_exactly_containing_groups() {
        let groups: Vec<_> = ["Red", "Green", "Blue", "Redux", "Infrared"]
            .iter()
            .map(|t| group(t, "", text(t)))
            .collect();
        let matched = filter_indices(&groups, "red");
        for (i, g) in groups.iter().enumerate() {
            assert_eq!(matched.contains(&i), g.search_text.contains("red"));
        }
        assert_eq!(matched, vec![0, 3, 4]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let collator = TextCollator::new();
        let groups = vec![
            group("1", "", SortKey::Number(2)),
            group("2", "", SortKey::Number(1)),
            group("3", "", SortKey::Number(2)),
            group("4", "", SortKey::Number(1)),
            group("5", "", SortKey::Missing),
        ];

        let ascending = build_view(&groups, "", false, &collator);
        assert_eq!(ascending, vec![1, 3, 0, 2, 4]);
        assert_eq!(ascending, build_view(&groups, "", false, &collator));

        // Equal keys keep their original order, not the reversed one.
        let descending = build_view(&groups, "", true, &collator);
        assert_eq!(descending, vec![4, 0, 2, 1, 3]);
        assert_eq!(descending, build_view(&groups, "", true, &collator));
    }

    #[test]
    fn test_text_sort_is_case_insensitive_and_numeric() {
        let collator = TextCollator::new();
        let groups = vec![
            group("Vol. 10", "", text("Vol. 10")),
            group("vol. 2", "", text("vol. 2")),
            group("abbey", "", text("abbey")),
            group("Abbey", "", text("Abbey")),
        ];
        assert_eq!(build_view(&groups, "", false, &collator), vec![2, 3, 1, 0]);
    }

    #[test]
    fn test_sorting_does_not_mutate_groups() {
        let collator = TextCollator::new();
        let groups = vec![group("b", "", text("b")), group("a", "", text("a"))];
        let before: Vec<_> = groups.iter().map(|g| g.display_title.clone()).collect();
        let view = build_view(&groups, "", false, &collator);
        assert_eq!(view, vec![1, 0]);
        let after: Vec<_> = groups.iter().map(|g| g.display_title.clone()).collect();
        assert_eq!(before, after);
    }
}
