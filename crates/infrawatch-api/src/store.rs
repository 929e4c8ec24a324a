use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig};
use crate::rows::{DomainRow, ServerRow};

pub const DEFAULT_DOMAINS_TABLE: &str = "project_domains";
pub const DEFAULT_SERVERS_TABLE: &str = "project_servers";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether trying again later has a chance of working
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::NetworkError(_)
                | StoreError::RateLimitExceeded
                | StoreError::ServerError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Connection settings for a PostgREST-style record store
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub domains_table: String,
    pub servers_table: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl StoreSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            domains_table: DEFAULT_DOMAINS_TABLE.to_string(),
            servers_table: DEFAULT_SERVERS_TABLE.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Read-only client for the infrastructure tables
pub struct StoreClient {
    client: reqwest::Client,
    settings: StoreSettings,
}

impl StoreClient {
    pub fn new(settings: StoreSettings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("infrawatch/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { client, settings })
    }

    /// Domains whose registration or certificate expiry is at or before
    /// `horizon`, and whose registration has not yet expired at `now`
    pub async fn expiring_domains(
        &self,
        now: DateTime<Utc>,
        horizon: DateTime<Utc>,
    ) -> Result<Vec<DomainRow>> {
        let query = domain_window_query(now, horizon);
        self.select(&self.settings.domains_table, &query).await
    }

    /// Servers whose renewal date falls within `[now, horizon]`
    pub async fn renewing_servers(
        &self,
        now: DateTime<Utc>,
        horizon: DateTime<Utc>,
    ) -> Result<Vec<ServerRow>> {
        let query = server_window_query(now, horizon);
        self.select(&self.settings.servers_table, &query).await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), table);
        let api_key = self.settings.api_key.clone();

        with_retry(&self.settings.retry, StoreError::is_transient, || async {
            let mut request = self.client.get(&url).query(query);

            if let Some(ref key) = api_key {
                request = request
                    .header("apikey", key)
                    .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", key));
            }

            debug!("Querying {} with {} filters", table, query.len());
            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(StoreError::AuthRequired);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StoreError::TableNotFound(table.to_string()));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(StoreError::RateLimitExceeded);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();

                if is_retryable_status(status) {
                    return Err(StoreError::ServerError {
                        status: status.as_u16(),
                        body,
                    });
                }

                return Err(StoreError::RequestFailed(format!(
                    "Status {}: {}",
                    status, body
                )));
            }

            let body = response.text().await?;
            let rows: Vec<T> = serde_json::from_str(&body)?;
            debug!("{} returned {} rows", table, rows.len());
            Ok(rows)
        })
        .await
    }
}

/// Timestamps go over the wire as `2025-01-01T00:00:00.000Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// PostgREST filters for the domain query
///
/// `(expiry <= horizon OR ssl_expiry <= horizon) AND expiry >= now`.
/// Values inside `or=(...)` are quoted because timestamps carry `.` and `:`,
/// both of which PostgREST treats as reserved there.
pub fn domain_window_query(now: DateTime<Utc>, horizon: DateTime<Utc>) -> Vec<(String, String)> {
    let horizon = format_timestamp(horizon);
    vec![
        ("select".to_string(), "*".to_string()),
        (
            "or".to_string(),
            format!(
                "(expiry_date.lte.\"{}\",ssl_expiry_date.lte.\"{}\")",
                horizon, horizon
            ),
        ),
        ("expiry_date".to_string(), format!("gte.{}", format_timestamp(now))),
    ]
}

/// PostgREST filters for the server query: `now <= renewal <= horizon`
pub fn server_window_query(now: DateTime<Utc>, horizon: DateTime<Utc>) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        ("renewal_date".to_string(), format!("lte.{}", format_timestamp(horizon))),
        ("renewal_date".to_string(), format!("gte.{}", format_timestamp(now))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_timestamp_uses_millis_and_z() {
        assert_eq!(format_timestamp(jan_first()), "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_domain_query_combines_both_expiries() {
        let now = jan_first();
        let horizon = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let query = domain_window_query(now, horizon);

        assert!(query.contains(&("select".to_string(), "*".to_string())));
        assert!(query.contains(&(
            "or".to_string(),
            "(expiry_date.lte.\"2025-01-31T00:00:00.000Z\",ssl_expiry_date.lte.\"2025-01-31T00:00:00.000Z\")"
                .to_string()
        )));
        assert!(query.contains(&(
            "expiry_date".to_string(),
            "gte.2025-01-01T00:00:00.000Z".to_string()
        )));
    }

    #[test]
    fn test_server_query_bounds_renewal_on_both_sides() {
        let now = jan_first();
        let horizon = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let query = server_window_query(now, horizon);

        let renewal: Vec<_> = query
            .iter()
            .filter(|(k, _)| k == "renewal_date")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(
            renewal,
            vec!["lte.2025-01-31T00:00:00.000Z", "gte.2025-01-01T00:00:00.000Z"]
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(StoreError::RateLimitExceeded.is_transient());
        assert!(StoreError::ServerError {
            status: 503,
            body: String::new()
        }
        .is_transient());

        assert!(!StoreError::AuthRequired.is_transient());
        assert!(!StoreError::TableNotFound("project_domains".into()).is_transient());
        assert!(!StoreError::RequestFailed("Status 400".into()).is_transient());
    }

    #[test]
    fn test_settings_default_tables() {
        let settings = StoreSettings::new("https://store.example/rest/v1");
        assert_eq!(settings.domains_table, "project_domains");
        assert_eq!(settings.servers_table, "project_servers");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.api_key.is_none());
    }

    fn jan_last() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()
    }

    fn client_for(server: &MockServer, retry: RetryConfig) -> StoreClient {
        let mut settings = StoreSettings::new(format!("{}/rest/v1/", server.uri()));
        settings.api_key = Some("anon-key".to_string());
        settings.retry = retry;
        StoreClient::new(settings).unwrap()
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_domain_request_carries_keys_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/project_domains"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(query_param("select", "*"))
            .and(query_param(
                "or",
                "(expiry_date.lte.\"2025-01-31T00:00:00.000Z\",ssl_expiry_date.lte.\"2025-01-31T00:00:00.000Z\")",
            ))
            .and(query_param("expiry_date", "gte.2025-01-01T00:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "d-1",
                    "domain_name": "a.com",
                    "expiry_date": "2025-01-05",
                    "ssl_expiry_date": "2025-01-20",
                    "auto_renew": true,
                    "created_at": "2024-01-01T00:00:00Z"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client_for(&server, RetryConfig::disabled())
            .expiring_domains(jan_first(), jan_last())
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].domain_name, "a.com");
        assert_eq!(rows[0].ssl_expiry_date.as_deref(), Some("2025-01-20"));
    }

    #[tokio::test]
    async fn test_server_request_bounds_renewal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/project_servers"))
            .and(query_param("renewal_date", "lte.2025-01-31T00:00:00.000Z"))
            .and(query_param("renewal_date", "gte.2025-01-01T00:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "s-1", "server_name": "b", "renewal_date": "2025-01-10", "monthly_cost": 1200 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client_for(&server, RetryConfig::disabled())
            .renewing_servers(jan_first(), jan_last())
            .await
            .unwrap();

        assert_eq!(rows[0].monthly_cost, Some(1200.0));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for status in [401u16, 403, 404, 429, 408, 503, 400] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/project_servers"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .expect(1)
                .mount(&server)
                .await;

            let err = client_for(&server, RetryConfig::disabled())
                .renewing_servers(jan_first(), jan_last())
                .await
                .unwrap_err();

            match status {
                401 | 403 => assert!(matches!(err, StoreError::AuthRequired), "{status}: {err}"),
                404 => assert!(
                    matches!(err, StoreError::TableNotFound(ref t) if t == "project_servers"),
                    "{status}: {err}"
                ),
                429 => assert!(matches!(err, StoreError::RateLimitExceeded), "{status}: {err}"),
                408 | 503 => assert!(
                    matches!(err, StoreError::ServerError { status: s, ref body } if s == status && body == "nope"),
                    "{status}: {err}"
                ),
                _ => assert!(matches!(err, StoreError::RequestFailed(_)), "{status}: {err}"),
            }
        }
    }

    #[tokio::test]
    async fn test_unavailable_then_ok_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/project_domains"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/project_domains"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client_for(&server, fast_retry())
            .expiring_domains(jan_first(), jan_last())
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_retries_run_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry())
            .renewing_servers(jan_first(), jan_last())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ServerError { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry())
            .expiring_domains(jan_first(), jan_last())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AuthRequired));
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, RetryConfig::disabled())
            .expiring_domains(jan_first(), jan_last())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ParseError(_)));
    }
}
