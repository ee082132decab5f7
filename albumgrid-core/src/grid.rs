//! The grid controller: owns the current snapshot, the selection, and thumbnail
//! loading, and answers everything a host needs to paint one frame.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, mpsc},
};

use albumgrid_state::{Group, GroupKey, GroupingMode, SortMode, TrackId};

use crate::{
    aggregate,
    config::GridConfig,
    grouping::KeyExtractor,
    loader::{LoadOutcome, Loader},
    scroll_indicator,
    selection::{ClickModifier, Direction, Selection},
    source::{LibraryEvent, LibrarySource},
    thumbnail::{Thumbnail, ThumbnailProvider, ThumbnailRequest},
    thumbnail_cache::ThumbnailCache,
    titleformat::TitleFormatter,
    view::{self, TextCollator},
    virtualizer::{Rect, Viewport},
};

pub struct GridArgs {
    pub source: Arc<dyn LibrarySource>,
    /// Change notifications from `source`, drained on every `Grid::update`.
    pub events: Option<mpsc::Receiver<LibraryEvent>>,
    pub formatter: Arc<dyn TitleFormatter>,
    pub provider: Arc<dyn ThumbnailProvider>,
    pub config: GridConfig,
}

/// The groups of one refresh, in aggregation order, with lookups into them.
struct GroupIndex {
    groups: Vec<Arc<Group>>,
    track_to_group: HashMap<TrackId, usize>,
    key_to_group: HashMap<GroupKey, usize>,
}
impl GroupIndex {
    fn new(groups: Vec<Arc<Group>>) -> Self {
        let mut track_to_group = HashMap::new();
        let mut key_to_group = HashMap::new();
        for (index, group) in groups.iter().enumerate() {
            key_to_group.insert(group.key.clone(), index);
            for track in &group.tracks {
                track_to_group.insert(track.clone(), index);
            }
        }
        Self {
            groups,
            track_to_group,
            key_to_group,
        }
    }
}

/// One immutable, fully built display list.
///
/// Display indices (positions in the grid) are only meaningful against the snapshot
/// they came from.
pub struct Snapshot {
    pub generation: u64,
    index: Arc<GroupIndex>,
    /// Display position to group index.
    order: Vec<usize>,
    /// Group index to display position, for groups that passed the filter.
    group_to_display: Vec<Option<usize>>,
}
impl Snapshot {
    fn new(generation: u64, index: Arc<GroupIndex>, order: Vec<usize>) -> Self {
        let mut group_to_display = vec![None; index.groups.len()];
        for (display, &group) in order.iter().enumerate() {
            group_to_display[group] = Some(display);
        }
        Self {
            generation,
            index,
            order,
            group_to_display,
        }
    }

    /// The number of displayed groups.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The number of groups before filtering.
    pub fn group_count(&self) -> usize {
        self.index.groups.len()
    }

    /// The number of tracks across all groups, before filtering.
    pub fn track_count(&self) -> usize {
        self.index.groups.iter().map(|group| group.track_count).sum()
    }

    pub fn get(&self, display_index: usize) -> Option<&Arc<Group>> {
        self.order
            .get(display_index)
            .map(|&group| &self.index.groups[group])
    }

    /// The displayed groups, in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Group>> + '_ {
        self.order.iter().map(|&group| &self.index.groups[group])
    }

    pub fn position_of_key(&self, key: &GroupKey) -> Option<usize> {
        let group = *self.index.key_to_group.get(key)?;
        self.group_to_display[group]
    }

    /// The display position of the group containing `track`, if it is displayed.
    pub fn display_index_of_track(&self, track: &TrackId) -> Option<usize> {
        let group = *self.index.track_to_group.get(track)?;
        self.group_to_display[group]
    }

    fn displayed_keys(&self) -> HashSet<GroupKey> {
        self.iter().map(|group| group.key.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailState {
    Ready(Thumbnail),
    /// A load has been requested; paint a placeholder for now.
    Loading,
    /// There is no artwork, or it could not be decoded or cached.
    Unavailable,
}

/// Everything needed to paint one cell.
#[derive(Debug, Clone)]
pub struct GridItem {
    pub index: usize,
    pub group: Arc<Group>,
    pub rect: Rect,
    pub is_now_playing: bool,
    pub is_selected: bool,
    pub thumbnail: ThumbnailState,
}

pub struct Grid {
    source: Arc<dyn LibrarySource>,
    events: Option<mpsc::Receiver<LibraryEvent>>,
    formatter: Arc<dyn TitleFormatter>,
    config: GridConfig,
    collator: TextCollator,

    snapshot: Arc<Snapshot>,
    filter: String,
    selection: Selection,
    playing: Option<TrackId>,
    dirty: bool,

    cache: Arc<ThumbnailCache>,
    loader: Loader,
    pending: HashSet<GroupKey>,
    failed: HashSet<GroupKey>,
}
impl Grid {
    const SCROLL_INDICATOR_CLUSTER_THRESHOLD: f32 = 0.015;

    pub fn new(args: GridArgs) -> Self {
        let config = args.config.validated();
        let cache = Arc::new(ThumbnailCache::new(config.cache.resolve_budget()));
        let loader = Loader::new(args.provider, cache.clone(), config.loader.threads);

        let mut grid = Self {
            source: args.source,
            events: args.events,
            formatter: args.formatter,
            config,
            collator: TextCollator::new(),

            snapshot: Arc::new(Snapshot::new(0, Arc::new(GroupIndex::new(vec![])), vec![])),
            filter: String::new(),
            selection: Selection::default(),
            playing: None,
            dirty: false,

            cache,
            loader,
            pending: HashSet::new(),
            failed: HashSet::new(),
        };
        grid.refresh();
        grid
    }

    /// Rebuilds the snapshot from the library: groups, then sort keys, then the view.
    ///
    /// Clears the selection and forgets failed thumbnail loads, so they are retried.
    pub fn refresh(&mut self) {
        self.dirty = false;

        let tracks = self.source.all_tracks();
        let track_count = tracks.len();
        let extractor = KeyExtractor::new(
            self.config.grouping,
            &self.config.grouping_pattern,
            self.formatter.as_ref(),
        );
        let mut groups = aggregate::aggregate(
            tracks.into_iter().map(|track| {
                let metadata = self.source.metadata(&track);
                (track, metadata)
            }),
            &extractor,
        );
        aggregate::assign_sort_keys(
            &mut groups,
            self.config.sort,
            &self.config.sort_pattern,
            self.formatter.as_ref(),
        );

        let index = Arc::new(GroupIndex::new(groups.into_iter().map(Arc::new).collect()));
        self.failed.clear();
        self.install(index);
        tracing::info!(
            "Refreshed grid: {track_count} tracks in {} groups ({} shown)",
            self.snapshot.group_count(),
            self.snapshot.len()
        );
    }

    /// Re-sorts and re-filters the current groups without rebuilding them.
    fn rebuild_view(&mut self) {
        let index = self.snapshot.index.clone();
        self.install(index);
        tracing::debug!("Rebuilt view: {} groups shown", self.snapshot.len());
    }

    fn install(&mut self, index: Arc<GroupIndex>) {
        let order = view::build_view(
            &index.groups,
            &self.filter,
            self.config.descending,
            &self.collator,
        );
        let mut snapshot = Snapshot::new(0, index, order);
        let live_keys = snapshot.displayed_keys();
        self.pending.retain(|key| live_keys.contains(key));
        snapshot.generation = self.loader.begin_generation(live_keys);

        self.snapshot = Arc::new(snapshot);
        self.selection.clear();
    }

    /// The current snapshot. It stays valid, if outdated, after later refreshes.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.clone()
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    /// The number of thumbnail loads that haven't completed yet.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if the grouping changed.
    pub fn set_grouping(&mut self, mode: GroupingMode) -> bool {
        if self.config.grouping == mode {
            return false;
        }
        self.config.grouping = mode;
        self.refresh();
        true
    }

    /// Sets the expression used by custom grouping. Returns true if it changed.
    pub fn set_grouping_pattern(&mut self, pattern: &str) -> bool {
        if self.config.grouping_pattern == pattern {
            return false;
        }
        self.config.grouping_pattern = pattern.to_string();
        if self.config.grouping == GroupingMode::Custom {
            self.refresh();
        }
        true
    }

    /// Returns true if the sort mode or direction changed. Flipping only the direction
    /// keeps the current groups.
    pub fn set_sort(&mut self, mode: SortMode, descending: bool) -> bool {
        let mode_changed = self.config.sort != mode;
        let direction_changed = self.config.descending != descending;
        self.config.sort = mode;
        self.config.descending = descending;
        if mode_changed {
            self.refresh();
        } else if direction_changed {
            self.rebuild_view();
        }
        mode_changed || direction_changed
    }

    /// Sets the expression used by custom sorting. Returns true if it changed.
    pub fn set_sort_pattern(&mut self, pattern: &str) -> bool {
        if self.config.sort_pattern == pattern {
            return false;
        }
        self.config.sort_pattern = pattern.to_string();
        if self.config.sort == SortMode::Custom {
            self.refresh();
        }
        true
    }

    /// Returns true if the filter changed.
    pub fn set_filter(&mut self, filter: &str) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter.to_string();
        self.rebuild_view();
        true
    }

    /// Thumbnails already cached at another size are still shown until they reload.
    pub fn set_thumbnail_size(&mut self, size: u32) -> bool {
        let size = size.clamp(
            *GridConfig::THUMBNAIL_SIZE_RANGE.start(),
            *GridConfig::THUMBNAIL_SIZE_RANGE.end(),
        );
        if self.config.thumbnail_size == size {
            return false;
        }
        self.config.thumbnail_size = size;
        true
    }

    /// Sets the column count; 0 fits as many as the width allows.
    pub fn set_columns(&mut self, columns: u32) -> bool {
        let columns = columns.min(GridConfig::MAX_COLUMNS);
        if self.config.columns == columns {
            return false;
        }
        self.config.columns = columns;
        true
    }

    /// Sets an explicit cache budget in MiB, or `None` to detect one. Returns the keys
    /// evicted to fit the new budget.
    pub fn set_cache_budget(&mut self, budget_mb: Option<u64>) -> Vec<GroupKey> {
        self.config.cache.budget_mb = budget_mb;
        self.config = std::mem::take(&mut self.config).validated();
        self.cache.set_budget(self.config.cache.resolve_budget())
    }

    /// Applies a change notification. Content changes are batched into a single
    /// refresh on the next `update`.
    pub fn handle_event(&mut self, event: LibraryEvent) {
        if event.requires_refresh() {
            tracing::debug!("Library changed: {event:?}");
            self.dirty = true;
        } else if let LibraryEvent::PlayingTrackChanged(track) = event {
            tracing::debug!("Now playing: {track:?}");
            self.playing = track;
        }
    }

    /// Drains library events and thumbnail completions, refreshing if the library
    /// changed. Returns the keys whose thumbnails changed and need repainting.
    pub fn update(&mut self) -> Vec<GroupKey> {
        let events: Vec<LibraryEvent> = self
            .events
            .as_ref()
            .map(|events| events.try_iter().collect())
            .unwrap_or_default();
        for event in events {
            self.handle_event(event);
        }

        let mut changed = vec![];
        let generation = self.snapshot.generation;
        for completion in self.loader.completions() {
            self.pending.remove(&completion.key);
            match completion.outcome {
                LoadOutcome::Loaded { byte_size } => {
                    tracing::debug!("Loaded thumbnail for {} ({byte_size} bytes)", completion.key);
                }
                LoadOutcome::Failed(e) => {
                    tracing::debug!("No thumbnail for {}: {e}", completion.key);
                    // Failures from before the last refresh are retried.
                    if completion.generation != generation {
                        continue;
                    }
                    self.failed.insert(completion.key.clone());
                }
                LoadOutcome::Rejected(e) => {
                    tracing::warn!("Thumbnail for {} not cached: {e}", completion.key);
                }
                LoadOutcome::Abandoned => continue,
            }
            if self.snapshot.position_of_key(&completion.key).is_some() {
                changed.push(completion.key);
            }
        }

        if self.dirty {
            self.refresh();
        }
        changed
    }

    /// A viewport over the current snapshot, laid out with the configured sizes.
    pub fn viewport(&self, width: u32, height: u32, scroll_offset: u32) -> Viewport {
        let (item_width, item_height) = self.config.item_size();
        Viewport {
            item_count: self.snapshot.len(),
            item_width,
            item_height,
            container_width: width,
            container_height: height,
            columns: self.config.columns,
            scroll_offset,
        }
    }

    /// The cells to paint for `viewport`, including the prefetch rows. Requests
    /// thumbnails for any that aren't cached yet.
    pub fn visible_items(&mut self, viewport: &Viewport) -> Vec<GridItem> {
        let snapshot = self.snapshot.clone();
        let viewport = Viewport {
            item_count: snapshot.len(),
            ..*viewport
        };
        let Some(range) = viewport.visible_range() else {
            return vec![];
        };
        let now_playing = self.now_playing_index();

        range
            .filter_map(|index| {
                let group = snapshot.get(index)?.clone();
                let rect = viewport.rect_of(index)?;
                let thumbnail = self.thumbnail_state(&group);
                Some(GridItem {
                    index,
                    is_now_playing: now_playing == Some(index),
                    is_selected: self.selection.contains(index),
                    group,
                    rect,
                    thumbnail,
                })
            })
            .collect()
    }

    fn thumbnail_state(&mut self, group: &Group) -> ThumbnailState {
        if self.failed.contains(&group.key) || self.cache.is_rejected(&group.key) {
            return ThumbnailState::Unavailable;
        }
        match self.cache.get(&group.key) {
            Some(thumbnail) => {
                if thumbnail.edge != self.config.thumbnail_size {
                    self.request_thumbnail(group);
                }
                ThumbnailState::Ready(thumbnail)
            }
            None => {
                self.request_thumbnail(group);
                ThumbnailState::Loading
            }
        }
    }

    fn request_thumbnail(&mut self, group: &Group) {
        if !self.pending.insert(group.key.clone()) {
            return;
        }
        let request = ThumbnailRequest {
            key: group.key.clone(),
            track: group.representative.clone(),
            edge: self.config.thumbnail_size,
        };
        if !self.loader.request(request) {
            tracing::warn!("No thumbnail loader available for {}", group.key);
            self.pending.remove(&group.key);
            self.failed.insert(group.key.clone());
        }
    }

    pub fn click(&mut self, index: usize, modifier: ClickModifier) {
        if index < self.snapshot.len() {
            self.selection.click(index, modifier);
        }
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.snapshot.len());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Moves the keyboard focus, selecting the focused item (or, with `extend`, the
    /// range from the anchor). Returns the focused index.
    pub fn move_selection(
        &mut self,
        direction: Direction,
        columns: usize,
        extend: bool,
    ) -> Option<usize> {
        self.selection
            .move_focus(direction, columns, self.snapshot.len(), extend)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The tracks of every selected group, in display order then track order.
    pub fn selected_tracks(&self) -> Vec<TrackId> {
        self.selection
            .indices()
            .filter_map(|index| self.snapshot.get(index))
            .flat_map(|group| group.tracks.iter().cloned())
            .collect()
    }

    pub fn playing_track(&self) -> Option<&TrackId> {
        self.playing.as_ref()
    }

    /// The display index of the group containing the playing track.
    pub fn now_playing_index(&self) -> Option<usize> {
        self.snapshot.display_index_of_track(self.playing.as_ref()?)
    }

    /// The scroll offset that brings the now-playing group into view.
    pub fn scroll_to_now_playing(&self, viewport: &Viewport) -> Option<u32> {
        let index = self.now_playing_index()?;
        let viewport = Viewport {
            item_count: self.snapshot.len(),
            ..*viewport
        };
        Some(viewport.scroll_offset_to_reveal(index))
    }

    /// Labels for the scroll bar (initial letters or years, depending on the sort
    /// mode) and their positions as fractions of the content height.
    pub fn scroll_indicator(&self, viewport: &Viewport) -> Vec<(String, f32)> {
        let viewport = Viewport {
            item_count: self.snapshot.len(),
            ..*viewport
        };
        scroll_indicator::compute_positions(
            self.snapshot.iter(),
            self.config.sort,
            viewport.column_count(),
            Self::SCROLL_INDICATOR_CLUSTER_THRESHOLD,
        )
    }
}
