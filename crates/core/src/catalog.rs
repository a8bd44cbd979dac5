//! Policy catalog: a typed, validated view of the rate-limit rules.
//!
//! The catalog is loaded from a YAML document with three sections
//! (`tiers`, `endpoints`, `ips`), validated fail-fast, and immutable
//! afterwards. The `rule` string of each endpoint is resolved to
//! [`RuleKind`] at parse time so the dispatch hot path matches on a
//! closed enum instead of comparing strings.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Strategy an endpoint's decisions follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RuleKind {
    /// Per-caller bucket (tier limits) plus the endpoint's global bucket.
    #[serde(rename = "tiers+endpoints")]
    TierEndpoint,
    /// Per-IP bucket (IP defaults) plus the endpoint's global bucket.
    #[serde(rename = "IP+endpoints")]
    IpEndpoint,
    /// One unscoped bucket shared by every caller of the endpoint.
    #[serde(rename = "endpoint")]
    EndpointOnly,
}

impl RuleKind {
    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::TierEndpoint => "tier_endpoint",
            RuleKind::IpEndpoint => "ip_endpoint",
            RuleKind::EndpointOnly => "endpoint",
        }
    }
}

/// Token limits for a named caller tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierLimit {
    /// Bucket capacity in tokens.
    pub capacity: i64,
    /// Refill rate in tokens per second.
    pub refill_rate: i64,
}

/// Rate-limit policy for one endpoint path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointPolicy {
    /// Which buckets a decision for this endpoint consults.
    pub rule: RuleKind,
    /// Tokens debited per allowed request.
    pub cost: i64,
    /// Capacity of the endpoint's global bucket.
    pub global_capacity: i64,
    /// Refill rate of the endpoint's global bucket, tokens per second.
    pub global_refill_rate: i64,
}

/// Default limits applied to per-IP buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IpDefaults {
    /// Bucket capacity in tokens.
    pub capacity: i64,
    /// Refill rate in tokens per second.
    pub refill_rate: i64,
}

/// The full policy document. Read-only after [`RuleCatalog::load`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleCatalog {
    /// Named caller tiers.
    pub tiers: HashMap<String, TierLimit>,
    /// Per-endpoint policies, keyed by path.
    pub endpoints: HashMap<String, EndpointPolicy>,
    /// Defaults for per-IP buckets.
    pub ips: IpDefaults,
}

impl RuleCatalog {
    /// Load and validate the catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate the catalog from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, CatalogError> {
        let catalog: RuleCatalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every catalog invariant, returning the first violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (name, tier) in &self.tiers {
            if tier.capacity <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "tier '{}': capacity must be positive",
                    name
                )));
            }
            if tier.refill_rate <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "tier '{}': refill_rate must be positive",
                    name
                )));
            }
        }
        for (path, endpoint) in &self.endpoints {
            if endpoint.cost <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "endpoint '{}': cost must be positive",
                    path
                )));
            }
            if endpoint.global_capacity <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "endpoint '{}': global_capacity must be positive",
                    path
                )));
            }
            if endpoint.global_refill_rate <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "endpoint '{}': global_refill_rate must be positive",
                    path
                )));
            }
        }
        if self.ips.capacity <= 0 {
            return Err(CatalogError::Invalid(
                "ip config: capacity must be positive".to_string(),
            ));
        }
        if self.ips.refill_rate <= 0 {
            return Err(CatalogError::Invalid(
                "ip config: refill_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy for an endpoint path, if one is configured.
    pub fn endpoint(&self, path: &str) -> Option<&EndpointPolicy> {
        self.endpoints.get(path)
    }

    /// Limits for a named tier, if it exists.
    pub fn tier(&self, name: &str) -> Option<&TierLimit> {
        self.tiers.get(name)
    }

    /// Defaults for per-IP buckets.
    pub fn ip(&self) -> &IpDefaults {
        &self.ips
    }

    /// All configured tier names, sorted for stable error payloads.
    pub fn tier_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tiers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RULES: &str = r#"
tiers:
  free:
    capacity: 100
    refill_rate: 10
  premium:
    capacity: 1000
    refill_rate: 100
endpoints:
  /api/test:
    rule: "tiers+endpoints"
    cost: 10
    global_capacity: 1000
    global_refill_rate: 100
  /api/list:
    rule: "endpoint"
    cost: 10
    global_capacity: 1000
    global_refill_rate: 100
  /api/login:
    rule: "IP+endpoints"
    cost: 1
    global_capacity: 5000
    global_refill_rate: 500
ips:
  capacity: 500
  refill_rate: 50
"#;

    #[test]
    fn test_parse_valid_catalog() {
        let catalog = RuleCatalog::from_yaml(VALID_RULES).unwrap();
        assert_eq!(catalog.tiers.len(), 2);
        assert_eq!(catalog.endpoints.len(), 3);
        assert_eq!(
            catalog.tier("free"),
            Some(&TierLimit {
                capacity: 100,
                refill_rate: 10
            })
        );
        assert_eq!(catalog.ip().capacity, 500);
    }

    #[test]
    fn test_rule_strings_resolve_to_kinds() {
        let catalog = RuleCatalog::from_yaml(VALID_RULES).unwrap();
        assert_eq!(
            catalog.endpoint("/api/test").unwrap().rule,
            RuleKind::TierEndpoint
        );
        assert_eq!(
            catalog.endpoint("/api/login").unwrap().rule,
            RuleKind::IpEndpoint
        );
        assert_eq!(
            catalog.endpoint("/api/list").unwrap().rule,
            RuleKind::EndpointOnly
        );
    }

    #[test]
    fn test_unknown_rule_fails_parse() {
        let yaml = VALID_RULES.replace("tiers+endpoints", "sliding-window");
        assert!(matches!(
            RuleCatalog::from_yaml(&yaml),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_endpoint_lookup() {
        let catalog = RuleCatalog::from_yaml(VALID_RULES).unwrap();
        assert!(catalog.endpoint("/api/unknown").is_none());
    }

    #[test]
    fn test_zero_tier_capacity_rejected() {
        let yaml = VALID_RULES.replace("capacity: 100\n", "capacity: 0\n");
        let err = RuleCatalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("capacity must be positive"));
    }

    #[test]
    fn test_negative_refill_rate_rejected() {
        let yaml = VALID_RULES.replace("refill_rate: 10\n", "refill_rate: -1\n");
        let err = RuleCatalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("refill_rate must be positive"));
    }

    #[test]
    fn test_zero_cost_rejected() {
        let yaml = VALID_RULES.replace("cost: 10", "cost: 0");
        let err = RuleCatalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("cost must be positive"));
    }

    #[test]
    fn test_zero_ip_defaults_rejected() {
        let yaml = VALID_RULES.replace("capacity: 500", "capacity: 0");
        let err = RuleCatalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("ip config"));
    }

    #[test]
    fn test_missing_section_fails_parse() {
        assert!(matches!(
            RuleCatalog::from_yaml("tiers: {}\nendpoints: {}\n"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_document_fails_parse() {
        assert!(RuleCatalog::from_yaml("").is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let catalog = RuleCatalog::from_yaml(VALID_RULES).unwrap();
        let serialized = serde_yaml::to_string(&catalog).unwrap();
        let reparsed = RuleCatalog::from_yaml(&serialized).unwrap();
        assert_eq!(catalog, reparsed);
    }

    #[test]
    fn test_tier_names_sorted() {
        let catalog = RuleCatalog::from_yaml(VALID_RULES).unwrap();
        assert_eq!(catalog.tier_names(), vec!["free", "premium"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RuleCatalog::load("/nonexistent/rules.yaml"),
            Err(CatalogError::Io(_))
        ));
    }
}
