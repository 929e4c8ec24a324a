// SQLite-backed payload cache
// Keeps the record store from being hammered by back-to-back dashboard loads

pub mod cache;

pub use cache::{CacheError, CacheManager};
