use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

use crate::models::{DomainRegistration, ResourceClass, ServerContract};
use crate::urgency::LOOKAHEAD_DAYS;
use crate::Result;

/// The slice of time a single run cares about: `[now, now + 30 days]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadWindow {
    now: DateTime<Utc>,
    horizon: DateTime<Utc>,
}

impl LookaheadWindow {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            horizon: now + Duration::days(LOOKAHEAD_DAYS),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn horizon(&self) -> DateTime<Utc> {
        self.horizon
    }

    /// Registration or certificate runs out by the horizon, and the
    /// registration itself hasn't lapsed yet
    pub fn admits_domain(&self, domain: &DomainRegistration) -> bool {
        let expires = domain.expires.at();
        let near = expires <= self.horizon
            || domain
                .tls_expires
                .as_ref()
                .is_some_and(|tls| tls.at() <= self.horizon);

        near && expires >= self.now
    }

    pub fn admits_server(&self, server: &ServerContract) -> bool {
        let renews = server.renews.at();
        renews >= self.now && renews <= self.horizon
    }
}

/// Somewhere infrastructure records come from
///
/// Implementations are expected to apply the window themselves: the remote
/// store turns it into query filters, local sources call the `admits_*`
/// predicates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch_domains(&self, window: &LookaheadWindow) -> Result<Vec<DomainRegistration>>;
    async fn fetch_servers(&self, window: &LookaheadWindow) -> Result<Vec<ServerContract>>;
}

/// Everything one run collected, exactly as the source returned it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedResources {
    pub domains: Vec<DomainRegistration>,
    pub servers: Vec<ServerContract>,
}

/// Fetch both resource classes at once
///
/// Either fetch failing fails the whole collection. There's no such thing
/// as "here are the domains, servers didn't make it".
pub async fn collect(
    source: &dyn ResourceSource,
    window: &LookaheadWindow,
) -> Result<CollectedResources> {
    use futures::future::try_join;

    debug!(
        "Collecting resources between {} and {}",
        window.now(),
        window.horizon()
    );

    let domains = async {
        source
            .fetch_domains(window)
            .await
            .map_err(|e| e.into_collection_failure(ResourceClass::Domains))
    };
    let servers = async {
        source
            .fetch_servers(window)
            .await
            .map_err(|e| e.into_collection_failure(ResourceClass::Servers))
    };

    let (domains, servers) = try_join(domains, servers).await.map_err(|e| {
        error!("Resource collection failed: {}", e);
        e
    })?;

    debug!(
        "Collected {} domains and {} servers",
        domains.len(),
        servers.len()
    );

    Ok(CollectedResources { domains, servers })
}
