//! The core of an album art grid: grouping tracks into cells, ordering and filtering
//! them, laying them out, and loading their artwork into a bounded cache.
pub mod aggregate;
pub mod config;
pub mod grouping;
pub mod loader;
pub mod scroll_indicator;
pub mod selection;
pub mod source;
pub mod thumbnail;
pub mod thumbnail_cache;
pub mod titleformat;
pub mod util;
pub mod view;
pub mod virtualizer;

mod grid;
pub use grid::{Grid, GridArgs, GridItem, Snapshot, ThumbnailState};

pub use albumgrid_state as state;
