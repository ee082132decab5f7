//! The library or playlist the grid displays.
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError, RwLock, mpsc},
};

use albumgrid_state::{TrackId, TrackMetadata};

/// Supplies tracks to the grid.
pub trait LibrarySource: Send + Sync {
    /// Every track currently in the library or playlist.
    fn all_tracks(&self) -> Vec<TrackId>;
    /// The metadata of a track, or `None` if it could not be read.
    fn metadata(&self, track: &TrackId) -> Option<TrackMetadata>;
}

/// A change notification from a library source.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    ItemsAdded(Vec<TrackId>),
    ItemsRemoved(Vec<TrackId>),
    ItemsModified(Vec<TrackId>),
    /// The source now represents a different playlist.
    PlaylistSwitched,
    /// Playback moved to another track, or stopped.
    PlayingTrackChanged(Option<TrackId>),
}
impl LibraryEvent {
    /// Whether the event changes the grid's contents, rather than just its highlighting.
    pub fn requires_refresh(&self) -> bool {
        !matches!(self, LibraryEvent::PlayingTrackChanged(_))
    }
}

#[derive(Default)]
struct MemoryLibraryState {
    order: Vec<TrackId>,
    metadata: HashMap<TrackId, Option<TrackMetadata>>,
}

/// A library held in memory, which notifies subscribers of changes.
#[derive(Default)]
pub struct MemoryLibrary {
    state: RwLock<MemoryLibraryState>,
    subscribers: Mutex<Vec<mpsc::Sender<LibraryEvent>>>,
}
impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: impl IntoIterator<Item = (TrackId, Option<TrackMetadata>)>) -> Self {
        let library = Self::new();
        {
            let mut state = library.state.write().unwrap_or_else(PoisonError::into_inner);
            for (id, metadata) in tracks {
                if state.metadata.insert(id.clone(), metadata).is_none() {
                    state.order.push(id);
                }
            }
        }
        library
    }

    /// Returns a receiver for all subsequent change notifications.
    pub fn subscribe(&self) -> mpsc::Receiver<LibraryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends an event to every live subscriber.
    pub fn notify(&self, event: LibraryEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Adds or replaces tracks.
    pub fn insert(&self, tracks: impl IntoIterator<Item = (TrackId, Option<TrackMetadata>)>) {
        let mut added = vec![];
        let mut modified = vec![];
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            for (id, metadata) in tracks {
                if state.metadata.insert(id.clone(), metadata).is_none() {
                    state.order.push(id.clone());
                    added.push(id);
                } else {
                    modified.push(id);
                }
            }
        }
        if !added.is_empty() {
            self.notify(LibraryEvent::ItemsAdded(added));
        }
        if !modified.is_empty() {
            self.notify(LibraryEvent::ItemsModified(modified));
        }
    }

    pub fn remove(&self, ids: &[TrackId]) {
        let mut removed = vec![];
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            for id in ids {
                if state.metadata.remove(id).is_some() {
                    removed.push(id.clone());
                }
            }
            state.order.retain(|id| !removed.contains(id));
        }
        if !removed.is_empty() {
            self.notify(LibraryEvent::ItemsRemoved(removed));
        }
    }

    /// Replaces the whole contents, as when the host switches playlists.
    pub fn replace(&self, tracks: impl IntoIterator<Item = (TrackId, Option<TrackMetadata>)>) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = MemoryLibraryState::default();
            for (id, metadata) in tracks {
                if state.metadata.insert(id.clone(), metadata).is_none() {
                    state.order.push(id);
                }
            }
        }
        self.notify(LibraryEvent::PlaylistSwitched);
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl LibrarySource for MemoryLibrary {
    fn all_tracks(&self) -> Vec<TrackId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    fn metadata(&self, track: &TrackId) -> Option<TrackMetadata> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .metadata
            .get(track)
            .cloned()
            .flatten()
    }
}
