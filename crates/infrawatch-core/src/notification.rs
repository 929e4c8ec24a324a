use serde::{Deserialize, Serialize};

use crate::models::{ResourceKind, TargetDate};
use crate::urgency::Urgency;

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DomainExpiry,
    SslExpiry,
    ServerRenewal,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::DomainExpiry => "domain_expiry",
            NotificationType::SslExpiry => "ssl_expiry",
            NotificationType::ServerRenewal => "server_renewal",
        }
    }
}

impl From<ResourceKind> for NotificationType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::DomainRegistration => NotificationType::DomainExpiry,
            ResourceKind::TlsCertificate => NotificationType::SslExpiry,
            ResourceKind::ServerContract => NotificationType::ServerRenewal,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the renewal feed
///
/// Built fresh on every run and never written back anywhere. The JSON
/// shape is what the dashboard already reads, so the passthrough fields
/// keep the store's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub urgency: Urgency,
    pub title: String,
    pub message: String,
    pub date: TargetDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(default, rename = "monthly_cost", skip_serializing_if = "Option::is_none")]
    pub recurring_cost: Option<f64>,
}

/// Per-tier counts over a feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl NotificationSummary {
    pub fn count(&self, urgency: Urgency) -> usize {
        match urgency {
            Urgency::Critical => self.critical,
            Urgency::Warning => self.warning,
            Urgency::Info => self.info,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// The full payload handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub summary: NotificationSummary,
}
