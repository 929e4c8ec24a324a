use chrono::{DateTime, Utc};

use crate::models::{DomainRegistration, ExpiringResource, ResourceKind, ServerContract};
use crate::notification::{Notification, NotificationType};
use crate::urgency::{days_until, Urgency, LOOKAHEAD_DAYS};

/// Turns collected resources into notifications, all against one `now`
#[derive(Debug, Clone, Copy)]
pub struct NotificationBuilder {
    now: DateTime<Utc>,
}

impl NotificationBuilder {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// One notification for the registration, plus one for its certificate
    /// when that runs out within the lookahead window
    ///
    /// The collector admits a domain when *either* date is close, so the
    /// certificate date is checked again here.
    pub fn for_domain(&self, domain: &DomainRegistration) -> Vec<Notification> {
        let mut notifications = vec![self.build(&ExpiringResource::Domain(domain.clone()))];

        if let Some(certificate) = domain.certificate() {
            if days_until(certificate.expires.at(), self.now) <= LOOKAHEAD_DAYS {
                notifications.push(self.build(&ExpiringResource::Certificate(certificate)));
            }
        }

        notifications
    }

    pub fn for_server(&self, server: &ServerContract) -> Notification {
        self.build(&ExpiringResource::Server(server.clone()))
    }

    /// Classify a single resource and dress it up for display
    pub fn build(&self, resource: &ExpiringResource) -> Notification {
        let date = resource.target_date();
        let days = days_until(date.at(), self.now);
        let urgency = Urgency::from_days_until(days);

        Notification {
            id: resource.id(),
            kind: NotificationType::from(resource.kind()),
            urgency,
            title: title_for(resource.kind(), resource.label()),
            message: message_for(resource.kind(), urgency, days),
            date: date.clone(),
            auto_renew: resource.auto_renew(),
            recurring_cost: resource.monthly_cost(),
        }
    }
}

fn title_for(kind: ResourceKind, label: &str) -> String {
    match kind {
        ResourceKind::DomainRegistration => format!("Domain renewal due: {}", label),
        ResourceKind::TlsCertificate => format!("SSL certificate renewal due: {}", label),
        ResourceKind::ServerContract => format!("Server renewal due: {}", label),
    }
}

fn message_for(kind: ResourceKind, urgency: Urgency, days: i64) -> String {
    let verb = match kind {
        ResourceKind::ServerContract => "renews",
        _ => "expires",
    };
    let unit = if days.abs() == 1 { "day" } else { "days" };

    match urgency {
        Urgency::Critical => format!("Action required: {} in {} {}", verb, days, unit),
        Urgency::Warning => format!("Coming up: {} in {} {}", verb, days, unit),
        Urgency::Info => format!("Heads up: {} in {} {}", verb, days, unit),
    }
}
