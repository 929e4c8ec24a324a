// Record store client - the only part of infrawatch that talks to the network
pub mod retry;
pub mod rows;
pub mod store;

// Re-export common types
pub use retry::RetryConfig;
pub use rows::{DomainRow, ServerRow};
pub use store::{StoreClient, StoreError, StoreSettings};
