// The renewal feed, start to finish
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::builder::NotificationBuilder;
use crate::collector::{collect, LookaheadWindow, ResourceSource};
use crate::feed::{aggregate, summarize};
use crate::notification::{Notification, NotificationFeed};
use crate::Result;

/// Collect, build, sort, count
///
/// Holds nothing between runs. Every call reads a fresh snapshot from the
/// source and derives the feed from scratch.
#[derive(Clone)]
pub struct NotificationEngine {
    source: Arc<dyn ResourceSource>,
}

impl NotificationEngine {
    pub fn new(source: Arc<dyn ResourceSource>) -> Self {
        Self { source }
    }

    /// Build the feed as of right now
    pub async fn run(&self) -> Result<NotificationFeed> {
        self.run_at(Utc::now()).await
    }

    /// Build the feed as of `now`
    ///
    /// `now` is read once and used for the query window, every day count
    /// and every classification, so a single run is self-consistent.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<NotificationFeed> {
        let window = LookaheadWindow::starting_at(now);
        let collected = collect(self.source.as_ref(), &window).await?;

        let builder = NotificationBuilder::new(now);
        let domain_notifications: Vec<Notification> = collected
            .domains
            .iter()
            .flat_map(|domain| builder.for_domain(domain))
            .collect();
        let server_notifications: Vec<Notification> = collected
            .servers
            .iter()
            .map(|server| builder.for_server(server))
            .collect();

        debug!(
            "Built {} domain/certificate and {} server notifications",
            domain_notifications.len(),
            server_notifications.len()
        );

        let notifications = aggregate(domain_notifications, server_notifications);
        let summary = summarize(&notifications);

        info!(
            "Notification feed ready: {} total ({} critical, {} warning, {} info)",
            summary.total, summary.critical, summary.warning, summary.info
        );

        Ok(NotificationFeed {
            notifications,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockResourceSource;
    use crate::models::{DomainRegistration, ResourceClass, ServerContract, TargetDate};
    use crate::notification::{NotificationSummary, NotificationType};
    use crate::urgency::{days_until, Urgency};
    use crate::Error;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn domain(id: &str, name: &str, expiry: &str, ssl: Option<&str>) -> DomainRegistration {
        DomainRegistration {
            id: id.to_string(),
            domain_name: name.to_string(),
            expires: TargetDate::parse(expiry).unwrap(),
            tls_expires: ssl.map(|s| TargetDate::parse(s).unwrap()),
            auto_renew: Some(false),
        }
    }

    fn server(id: &str, name: &str, renewal: &str) -> ServerContract {
        ServerContract {
            id: id.to_string(),
            server_name: name.to_string(),
            renews: TargetDate::parse(renewal).unwrap(),
            monthly_cost: Some(980.0),
            auto_renew: None,
        }
    }

    fn engine_with(
        domains: Vec<DomainRegistration>,
        servers: Vec<ServerContract>,
    ) -> NotificationEngine {
        let mut source = MockResourceSource::new();
        source
            .expect_fetch_domains()
            .returning(move |_| Ok(domains.clone()));
        source
            .expect_fetch_servers()
            .returning(move |_| Ok(servers.clone()));
        NotificationEngine::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_example_feed() {
        let engine = engine_with(
            vec![domain("d-a", "a.com", "2025-01-05", Some("2025-01-20"))],
            vec![server("s-b", "b", "2025-01-10")],
        );

        let feed = engine.run_at(now()).await.unwrap();

        let shape: Vec<_> = feed
            .notifications
            .iter()
            .map(|n| (n.kind, n.urgency, n.date.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (NotificationType::DomainExpiry, Urgency::Critical, "2025-01-05"),
                (NotificationType::ServerRenewal, Urgency::Warning, "2025-01-10"),
                (NotificationType::SslExpiry, Urgency::Info, "2025-01-20"),
            ]
        );
        assert_eq!(
            feed.summary,
            NotificationSummary {
                total: 3,
                critical: 1,
                warning: 1,
                info: 1
            }
        );
    }

    #[tokio::test]
    async fn test_every_notification_matches_its_day_count() {
        let engine = engine_with(
            vec![
                domain("d-1", "one.com", "2025-01-02", Some("2025-01-29")),
                domain("d-2", "two.com", "2025-01-08T06:00:00Z", Some("2025-01-15")),
                domain("d-3", "three.com", "2025-04-01", Some("2025-01-09")),
            ],
            vec![
                server("s-1", "db", "2025-01-14T23:59:59Z"),
                server("s-2", "web", "2025-01-31"),
            ],
        );

        let feed = engine.run_at(now()).await.unwrap();

        for n in &feed.notifications {
            let days = days_until(n.date.at(), now());
            assert_eq!(n.urgency == Urgency::Critical, days <= 7, "{}", n.id);
            assert_eq!(n.urgency == Urgency::Warning, days > 7 && days <= 14, "{}", n.id);
            assert_eq!(n.urgency == Urgency::Info, days > 14, "{}", n.id);
            if n.kind == NotificationType::SslExpiry {
                assert!(days <= 30);
            }
        }

        for pair in feed.notifications.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.urgency.rank() <= b.urgency.rank());
            if a.urgency == b.urgency {
                assert!(a.date.at() <= b.date.at());
            }
        }

        let summary = feed.summary;
        assert_eq!(summary.total, feed.notifications.len());
        assert_eq!(summary.critical + summary.warning + summary.info, summary.total);
    }

    #[tokio::test]
    async fn test_server_failure_fails_the_whole_run() {
        let mut source = MockResourceSource::new();
        source
            .expect_fetch_domains()
            .returning(|_| Ok(vec![domain("d-a", "a.com", "2025-01-05", Some("2025-01-20"))]));
        source.expect_fetch_servers().returning(|_| {
            Err(Error::CollectionFailed {
                resource: ResourceClass::Servers,
                reason: "Network error: connection refused".to_string(),
            })
        });

        let engine = NotificationEngine::new(Arc::new(source));
        let err = engine.run_at(now()).await.unwrap_err();
        assert!(err.is_collection_failure());
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_feed() {
        let engine = engine_with(Vec::new(), Vec::new());
        let feed = engine.run_at(now()).await.unwrap();

        assert!(feed.notifications.is_empty());
        assert_eq!(feed.summary, NotificationSummary::default());
    }

    #[tokio::test]
    async fn test_run_is_repeatable() {
        let engine = engine_with(
            vec![
                domain("d-1", "one.com", "2025-01-10", None),
                domain("d-2", "two.com", "2025-01-10", None),
            ],
            vec![server("s-1", "db", "2025-01-10")],
        );

        let first = engine.run_at(now()).await.unwrap();
        let second = engine.run_at(now()).await.unwrap();
        assert_eq!(first, second);
    }
}
