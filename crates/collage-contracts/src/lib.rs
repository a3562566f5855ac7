//! Shared building blocks for a collage run: the per-run term bookkeeping,
//! the filler word source and the on-disk run records.

pub mod error;
pub mod events;
pub mod runs;
pub mod terms;

pub use error::RecordError;

/// Number of photos every collage is assembled from.
pub const COLLAGE_SIZE: usize = 10;
