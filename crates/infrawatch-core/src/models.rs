use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use infrawatch_api::{DomainRow, ServerRow};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// The two tables the collector reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Domains,
    Servers,
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceClass::Domains => write!(f, "domain registrations"),
            ResourceClass::Servers => write!(f, "server contracts"),
        }
    }
}

/// Which kind of infrastructure a resource is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    DomainRegistration,
    TlsCertificate,
    ServerContract,
}

/// A date something needs doing by
///
/// Keeps the store's original text so it can be echoed back untouched,
/// alongside the parsed instant used for arithmetic and ordering.
/// Calendar dates and zone-less timestamps are read as UTC.
#[derive(Debug, Clone)]
pub struct TargetDate {
    raw: String,
    at: DateTime<Utc>,
}

impl TargetDate {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let at = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            dt.with_timezone(&Utc)
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            naive.and_utc()
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
            naive.and_utc()
        } else {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)?
                .and_utc()
        };

        Some(Self {
            raw: raw.to_string(),
            at,
        })
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for TargetDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unrecognised date '{}'", s))
    }
}

impl std::fmt::Display for TargetDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for TargetDate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TargetDate {}

impl PartialOrd for TargetDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TargetDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl Serialize for TargetDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TargetDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A domain registration, possibly carrying its TLS certificate's expiry
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRegistration {
    pub id: String,
    pub domain_name: String,
    pub expires: TargetDate,
    pub tls_expires: Option<TargetDate>,
    pub auto_renew: Option<bool>,
}

impl DomainRegistration {
    /// The embedded certificate, if the row knows when it runs out
    pub fn certificate(&self) -> Option<TlsCertificate> {
        self.tls_expires.as_ref().map(|expires| TlsCertificate {
            domain_id: self.id.clone(),
            domain_name: self.domain_name.clone(),
            expires: expires.clone(),
        })
    }
}

/// A TLS certificate, only ever seen riding along on a domain
#[derive(Debug, Clone, PartialEq)]
pub struct TlsCertificate {
    pub domain_id: String,
    pub domain_name: String,
    pub expires: TargetDate,
}

/// A hosting contract that comes up for renewal
#[derive(Debug, Clone, PartialEq)]
pub struct ServerContract {
    pub id: String,
    pub server_name: String,
    pub renews: TargetDate,
    pub monthly_cost: Option<f64>,
    pub auto_renew: Option<bool>,
}

/// Anything with a date attached that somebody has to act on
#[derive(Debug, Clone, PartialEq)]
pub enum ExpiringResource {
    Domain(DomainRegistration),
    Certificate(TlsCertificate),
    Server(ServerContract),
}

impl ExpiringResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ExpiringResource::Domain(_) => ResourceKind::DomainRegistration,
            ExpiringResource::Certificate(_) => ResourceKind::TlsCertificate,
            ExpiringResource::Server(_) => ResourceKind::ServerContract,
        }
    }

    /// Identifier the resulting notification goes by
    ///
    /// Certificates have no row of their own, so they borrow the parent
    /// domain's id with a fixed prefix. Same domain, same key, every run.
    pub fn id(&self) -> String {
        match self {
            ExpiringResource::Domain(d) => d.id.clone(),
            ExpiringResource::Certificate(c) => format!("ssl-{}", c.domain_id),
            ExpiringResource::Server(s) => s.id.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ExpiringResource::Domain(d) => &d.domain_name,
            ExpiringResource::Certificate(c) => &c.domain_name,
            ExpiringResource::Server(s) => &s.server_name,
        }
    }

    pub fn target_date(&self) -> &TargetDate {
        match self {
            ExpiringResource::Domain(d) => &d.expires,
            ExpiringResource::Certificate(c) => &c.expires,
            ExpiringResource::Server(s) => &s.renews,
        }
    }

    pub fn auto_renew(&self) -> Option<bool> {
        match self {
            ExpiringResource::Domain(d) => d.auto_renew,
            ExpiringResource::Certificate(_) => None,
            ExpiringResource::Server(s) => s.auto_renew,
        }
    }

    pub fn monthly_cost(&self) -> Option<f64> {
        match self {
            ExpiringResource::Server(s) => s.monthly_cost,
            _ => None,
        }
    }
}

fn required_date(
    resource: ResourceClass,
    id: &str,
    column: &str,
    value: Option<&str>,
) -> crate::Result<TargetDate> {
    let raw = value.ok_or_else(|| Error::InvalidRecord {
        resource,
        id: id.to_string(),
        reason: format!("missing {}", column),
    })?;
    optional_date(resource, id, column, Some(raw))?.ok_or_else(|| Error::InvalidRecord {
        resource,
        id: id.to_string(),
        reason: format!("missing {}", column),
    })
}

fn optional_date(
    resource: ResourceClass,
    id: &str,
    column: &str,
    value: Option<&str>,
) -> crate::Result<Option<TargetDate>> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => TargetDate::parse(raw).map(Some).ok_or_else(|| Error::InvalidRecord {
            resource,
            id: id.to_string(),
            reason: format!("unparseable {} '{}'", column, raw),
        }),
    }
}

impl TryFrom<DomainRow> for DomainRegistration {
    type Error = Error;

    fn try_from(row: DomainRow) -> crate::Result<Self> {
        let class = ResourceClass::Domains;
        if row.domain_name.trim().is_empty() {
            return Err(Error::InvalidRecord {
                resource: class,
                id: row.id,
                reason: "empty domain_name".to_string(),
            });
        }

        let expires = required_date(class, &row.id, "expiry_date", row.expiry_date.as_deref())?;
        let tls_expires =
            optional_date(class, &row.id, "ssl_expiry_date", row.ssl_expiry_date.as_deref())?;

        Ok(Self {
            id: row.id,
            domain_name: row.domain_name,
            expires,
            tls_expires,
            auto_renew: row.auto_renew,
        })
    }
}

impl TryFrom<ServerRow> for ServerContract {
    type Error = Error;

    fn try_from(row: ServerRow) -> crate::Result<Self> {
        let class = ResourceClass::Servers;
        if row.server_name.trim().is_empty() {
            return Err(Error::InvalidRecord {
                resource: class,
                id: row.id,
                reason: "empty server_name".to_string(),
            });
        }

        let renews = required_date(class, &row.id, "renewal_date", row.renewal_date.as_deref())?;

        if let Some(cost) = row.monthly_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::InvalidRecord {
                    resource: class,
                    id: row.id,
                    reason: format!("monthly_cost must be a non-negative number, got {}", cost),
                });
            }
        }

        Ok(Self {
            id: row.id,
            server_name: row.server_name,
            renews,
            monthly_cost: row.monthly_cost,
            auto_renew: row.auto_renew,
        })
    }
}
