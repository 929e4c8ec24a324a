use serde::{Deserialize, Serialize};

/// A row from the `project_domains` table
///
/// Dates stay as the raw strings the store hands back. Parsing and
/// validation happen one layer up, where a bad row can be reported against
/// the resource it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRow {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub domain_name: String,
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub ssl_expiry_date: Option<String>,
    #[serde(default)]
    pub auto_renew: Option<bool>,
    #[serde(default)]
    pub registrar: Option<String>,
}

/// A row from the `project_servers` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRow {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub server_name: String,
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub monthly_cost: Option<f64>,
    #[serde(default)]
    pub auto_renew: Option<bool>,
    #[serde(default)]
    pub provider: Option<String>,
}
