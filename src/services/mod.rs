pub mod archive;
pub mod classifier;
pub mod disk;
pub mod listing_cache;
pub mod resolver;
