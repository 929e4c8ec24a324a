// Core business logic lives here - the renewal feed and everything it needs
pub mod builder;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod feed;
pub mod feed_with_cache;
pub mod models;
pub mod notification;
pub mod providers;
pub mod urgency;

pub use builder::NotificationBuilder;
pub use collector::{collect, CollectedResources, LookaheadWindow, ResourceSource};
pub use config::Config;
pub use engine::NotificationEngine;
pub use error::Error;
pub use export::{Exporter, FeedFormat};
pub use feed::{aggregate, summarize, FeedResponse};
pub use feed_with_cache::CachedNotificationEngine;
pub use models::{
    DomainRegistration, ExpiringResource, ResourceClass, ResourceKind, ServerContract, TargetDate,
    TlsCertificate,
};
pub use notification::{Notification, NotificationFeed, NotificationSummary, NotificationType};
pub use providers::{SnapshotSource, StoreSource};
pub use urgency::{classify, days_until, Urgency};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
