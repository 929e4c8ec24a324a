// Snapshot provider - reads store rows from a JSON file instead of the network
use std::path::Path;

use async_trait::async_trait;
use infrawatch_api::{DomainRow, ServerRow};
use serde::{Deserialize, Serialize};

use crate::{
    collector::{LookaheadWindow, ResourceSource},
    models::{DomainRegistration, ServerContract, TargetDate},
    providers::store::{validate_domains, validate_servers},
    Result,
};

/// A dump of both tables, in the same row shape the store returns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub domains: Vec<DomainRow>,
    #[serde(default)]
    pub servers: Vec<ServerRow>,
}

/// Offline source backed by a snapshot
///
/// There's no query engine here, so the window is applied with the same
/// predicates the remote filters encode. Rows those filters would drop are
/// never validated.
#[derive(Debug)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[async_trait]
impl ResourceSource for SnapshotSource {
    async fn fetch_domains(&self, window: &LookaheadWindow) -> Result<Vec<DomainRegistration>> {
        let rows: Vec<DomainRow> = self
            .snapshot
            .domains
            .iter()
            .filter(|row| may_admit_domain(window, row))
            .cloned()
            .collect();

        Ok(validate_domains(rows)?
            .into_iter()
            .filter(|d| window.admits_domain(d))
            .collect())
    }

    async fn fetch_servers(&self, window: &LookaheadWindow) -> Result<Vec<ServerContract>> {
        let rows: Vec<ServerRow> = self
            .snapshot
            .servers
            .iter()
            .filter(|row| may_admit_server(window, row))
            .cloned()
            .collect();

        Ok(validate_servers(rows)?
            .into_iter()
            .filter(|s| window.admits_server(s))
            .collect())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.trim().is_empty())
}

/// Raw-row version of the window check, run before validation
///
/// A row the store's filters would drop is skipped whatever else is wrong
/// with it: a missing date never satisfies `gte`. A date that doesn't parse
/// can't be ruled out, so the row goes on to validation and fails there.
fn may_admit_domain(window: &LookaheadWindow, row: &DomainRow) -> bool {
    let Some(raw) = present(&row.expiry_date) else {
        return false;
    };
    let Some(expires) = TargetDate::parse(raw) else {
        return true;
    };
    if expires.at() < window.now() {
        return false;
    }
    if expires.at() <= window.horizon() {
        return true;
    }

    match present(&row.ssl_expiry_date) {
        None => false,
        Some(raw) => TargetDate::parse(raw).map_or(true, |tls| tls.at() <= window.horizon()),
    }
}

fn may_admit_server(window: &LookaheadWindow, row: &ServerRow) -> bool {
    match present(&row.renewal_date) {
        None => false,
        Some(raw) => TargetDate::parse(raw)
            .map_or(true, |renews| renews.at() >= window.now() && renews.at() <= window.horizon()),
    }
}
