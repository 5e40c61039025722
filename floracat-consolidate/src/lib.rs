//! Multi-source trait fusion and distribution range consolidation.
//!
//! Both consolidators are idempotent bulk transforms, safe to re-run
//! after any crawler completes: they upsert by `species_id` and never
//! block concurrent reads of the tables they write.

pub mod distribution_consolidator;
pub mod precedence;
pub mod trait_consolidator;

pub use trait_consolidator::{fuse, is_brazil_region};
