use serde::{Deserialize, Serialize};

use crate::notification::{Notification, NotificationFeed, NotificationSummary};
use crate::urgency::Urgency;

/// What the dashboard shows when the feed can't be built
pub const FAILURE_MESSAGE: &str = "Failed to fetch notifications";

/// Merge domain- and server-derived notifications into one prioritized list
///
/// Most urgent first, then soonest first. `sort_by` is stable, so exact
/// ties keep their collection order and repeat runs agree with each other.
pub fn aggregate(
    domain_notifications: Vec<Notification>,
    server_notifications: Vec<Notification>,
) -> Vec<Notification> {
    let mut merged = domain_notifications;
    merged.extend(server_notifications);
    sort_notifications(&mut merged);
    merged
}

pub fn sort_notifications(notifications: &mut [Notification]) {
    notifications.sort_by(|a, b| {
        a.urgency
            .rank()
            .cmp(&b.urgency.rank())
            .then_with(|| a.date.at().cmp(&b.date.at()))
    });
}

/// Count notifications per urgency tier
pub fn summarize(notifications: &[Notification]) -> NotificationSummary {
    notifications
        .iter()
        .fold(NotificationSummary::default(), |mut summary, n| {
            summary.total += 1;
            match n.urgency {
                Urgency::Critical => summary.critical += 1,
                Urgency::Warning => summary.warning += 1,
                Urgency::Info => summary.info += 1,
            }
            summary
        })
}

impl NotificationFeed {
    pub fn empty() -> Self {
        Self {
            notifications: Vec::new(),
            summary: NotificationSummary::default(),
        }
    }
}

/// The response envelope
///
/// Either the full feed or an error marker, never a zeroed summary standing
/// in for "couldn't reach the store".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Feed(NotificationFeed),
    Failure { error: String },
}

impl FeedResponse {
    pub fn failure() -> Self {
        FeedResponse::Failure {
            error: FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FeedResponse::Failure { .. })
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<crate::Result<NotificationFeed>> for FeedResponse {
    fn from(result: crate::Result<NotificationFeed>) -> Self {
        match result {
            Ok(feed) => FeedResponse::Feed(feed),
            Err(e) => {
                tracing::error!("Error fetching notifications: {}", e);
                FeedResponse::failure()
            }
        }
    }
}
