//! Internal utilities for the synchronizer.

pub mod ordering;
pub mod recent_ids;

pub use ordering::{move_to_front, sort_by_recency};
pub use recent_ids::RecentIds;
