// Resource sources - where the collector gets its records from
pub mod snapshot;
pub mod store;

pub use snapshot::SnapshotSource;
pub use store::StoreSource;
