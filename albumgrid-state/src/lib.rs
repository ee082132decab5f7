//! Representations of the album grid's data model: tracks as supplied by a library,
//! the groups they are folded into, and the modes that control grouping and sorting.
//!
//! Separated out so that hosts and utilities can share the types without pulling in
//! the grid logic.
#![deny(missing_docs)]

mod group;
pub use group::{Group, GroupKey};

mod mode;
pub use mode::{GroupingMode, ParseModeError, SortMode};

mod sort_key;
pub use sort_key::SortKey;

mod track;
pub use track::{TrackId, TrackMetadata};
