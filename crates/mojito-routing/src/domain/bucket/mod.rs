//! Buckets: capacity-bounded slices of the identifier space.

// Semantic submodules
mod counter;
mod entity;
mod id;

// Re-export public API
pub use counter::ClassfulNetworkCounter;
pub use entity::Bucket;
pub use id::BucketId;
