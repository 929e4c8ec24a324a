// Store provider - bridges the record store client with ResourceSource
use async_trait::async_trait;
use infrawatch_api::{DomainRow, ServerRow, StoreClient};
use tracing::debug;

use crate::{
    collector::{LookaheadWindow, ResourceSource},
    config::StoreConfig,
    models::{DomainRegistration, ResourceClass, ServerContract},
    Error, Result,
};

/// Wrapper around StoreClient that implements ResourceSource
///
/// The window becomes query filters on the store side, so rows come back
/// already narrowed down. They still get validated here before anything
/// downstream sees them.
pub struct StoreSource {
    client: StoreClient,
}

impl StoreSource {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let settings = config.to_settings()?;
        let client = StoreClient::new(settings).map_err(|e| {
            Error::ConfigError(format!("Failed to build record store client: {}", e))
        })?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ResourceSource for StoreSource {
    async fn fetch_domains(&self, window: &LookaheadWindow) -> Result<Vec<DomainRegistration>> {
        let rows = self
            .client
            .expiring_domains(window.now(), window.horizon())
            .await
            .map_err(|e| Error::CollectionFailed {
                resource: ResourceClass::Domains,
                reason: e.to_string(),
            })?;

        debug!("Store returned {} domain rows", rows.len());
        validate_domains(rows)
    }

    async fn fetch_servers(&self, window: &LookaheadWindow) -> Result<Vec<ServerContract>> {
        let rows = self
            .client
            .renewing_servers(window.now(), window.horizon())
            .await
            .map_err(|e| Error::CollectionFailed {
                resource: ResourceClass::Servers,
                reason: e.to_string(),
            })?;

        debug!("Store returned {} server rows", rows.len());
        validate_servers(rows)
    }
}

/// Convert raw domain rows, failing on the first one that doesn't hold up
pub fn validate_domains(rows: Vec<DomainRow>) -> Result<Vec<DomainRegistration>> {
    rows.into_iter().map(DomainRegistration::try_from).collect()
}

pub fn validate_servers(rows: Vec<ServerRow>) -> Result<Vec<ServerContract>> {
    rows.into_iter().map(ServerContract::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn row(id: &str, renewal: Option<&str>) -> ServerRow {
        ServerRow {
            id: id.to_string(),
            project_id: Some("p-1".to_string()),
            server_name: format!("server-{}", id),
            renewal_date: renewal.map(String::from),
            monthly_cost: None,
            auto_renew: None,
            provider: None,
        }
    }

    #[test]
    fn test_validate_servers_all_good() {
        let servers =
            validate_servers(vec![row("1", Some("2025-01-10")), row("2", Some("2025-01-20"))])
                .unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].server_name, "server-2");
    }

    #[test]
    fn test_one_bad_row_fails_the_batch() {
        let err = validate_servers(vec![row("1", Some("2025-01-10")), row("2", None)]).unwrap_err();
        match err {
            Error::InvalidRecord { id, .. } => assert_eq!(id, "2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_config_requires_a_url() {
        let config = StoreConfig::default();
        assert!(matches!(
            StoreSource::from_config(&config),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_config_builds_client() {
        let config = StoreConfig {
            url: Some("https://store.example/rest/v1".to_string()),
            ..StoreConfig::default()
        };
        assert!(StoreSource::from_config(&config).is_ok());
    }
}
