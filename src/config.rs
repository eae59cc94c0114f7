//! Cache Configuration
//!
//! Tier capacities, TTL and maintenance settings, loadable from YAML.
//!
//! ```yaml
//! capacities:
//!   hot: 100
//!   warm: 500
//!   cold: 1000
//! default_ttl: 1h
//! maintenance_interval: 60s
//! policy:
//!   hot_demotion_min_accesses: 1
//!   warm_demotion_min_accesses: 2
//!   maintenance_promotion_min_accesses: 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{Tier, TierPolicy};
use crate::error::{Error, Result};

/// Default hot tier capacity (entries)
pub const DEFAULT_HOT_CAPACITY: usize = 100;

/// Default warm tier capacity (entries)
pub const DEFAULT_WARM_CAPACITY: usize = 500;

/// Default cold tier capacity (entries)
pub const DEFAULT_COLD_CAPACITY: usize = 1000;

/// Default time-to-live for entries written without an explicit TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default interval between maintenance sweeps
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// Capacities
// =============================================================================

/// Maximum number of entries held by each tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCapacities {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
}

impl Default for TierCapacities {
    fn default() -> Self {
        Self {
            hot: DEFAULT_HOT_CAPACITY,
            warm: DEFAULT_WARM_CAPACITY,
            cold: DEFAULT_COLD_CAPACITY,
        }
    }
}

impl TierCapacities {
    pub fn new(hot: usize, warm: usize, cold: usize) -> Self {
        Self { hot, warm, cold }
    }

    /// Capacity of a single tier
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Hot => self.hot,
            Tier::Warm => self.warm,
            Tier::Cold => self.cold,
        }
    }

    /// Combined capacity of all tiers
    pub fn total(&self) -> usize {
        self.hot + self.warm + self.cold
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Per-tier entry capacities
    pub capacities: TierCapacities,
    /// TTL applied when `set` is called without one
    #[serde(with = "duration_str")]
    pub default_ttl: Duration,
    /// Interval between background maintenance passes
    #[serde(with = "duration_str")]
    pub maintenance_interval: Duration,
    /// Promotion/demotion thresholds
    pub policy: TierPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacities: TierCapacities::default(),
            default_ttl: DEFAULT_TTL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            policy: TierPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Configuration with the given capacities and default TTL
    pub fn new(capacities: TierCapacities, default_ttl: Duration) -> Self {
        Self {
            capacities,
            default_ttl,
            ..Default::default()
        }
    }

    /// Reject configurations that would make the cache degenerate
    pub fn validate(&self) -> Result<()> {
        for tier in Tier::ALL {
            if self.capacities.get(tier) == 0 {
                return Err(Error::InvalidConfiguration(format!(
                    "{} tier capacity must be greater than zero",
                    tier
                )));
            }
        }

        if self.default_ttl.is_zero() {
            return Err(Error::InvalidConfiguration(
                "default TTL must be greater than zero".to_string(),
            ));
        }

        if self.maintenance_interval.is_zero() {
            return Err(Error::InvalidConfiguration(
                "maintenance interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

// =============================================================================
// Duration Parsing
// =============================================================================

/// Parse a duration string like "250ms", "30s", "5m", "1h30m" or "2d".
///
/// A bare trailing number is read as seconds. Whitespace is ignored.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::DurationParse("empty duration string".to_string()));
    }

    let mut total = Duration::ZERO;
    let mut rest = compact.as_str();

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(Error::DurationParse(format!(
                "expected a number in duration: {}",
                s
            )));
        }

        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| Error::DurationParse(format!("invalid number in duration: {}", s)))?;
        rest = &rest[digits_end..];

        let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = rest[..unit_end].to_ascii_lowercase();
        rest = &rest[unit_end..];

        let part = match unit.as_str() {
            "ms" => Some(Duration::from_millis(value)),
            "" | "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "d" => value.checked_mul(86400).map(Duration::from_secs),
            other => {
                return Err(Error::DurationParse(format!(
                    "unknown duration unit: {}",
                    other
                )))
            }
        };

        total = part
            .and_then(|p| total.checked_add(p))
            .ok_or_else(|| Error::DurationParse(format!("duration overflows: {}", s)))?;
    }

    Ok(total)
}

/// Render a duration in the largest whole unit `parse_duration` accepts
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() != 0 || d.is_zero() {
        return format!("{}ms", d.as_millis());
    }

    let secs = d.as_secs();
    if secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Serde adapter storing durations as human-readable strings
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.capacities.hot, 100);
        assert_eq!(config.capacities.warm, 500);
        assert_eq!(config.capacities.cold, 1000);
        assert_eq!(config.capacities.total(), 1600);
        assert_eq!(config.maintenance_interval, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CacheConfig::new(TierCapacities::new(10, 0, 10), Duration::from_secs(1));
        assert_matches!(config.validate(), Err(Error::InvalidConfiguration(msg)) if msg.contains("Warm"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CacheConfig::new(TierCapacities::default(), Duration::ZERO);
        assert_matches!(config.validate(), Err(Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = CacheConfig {
            maintenance_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1s500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration(" 2 m ").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert_matches!(parse_duration(""), Err(Error::DurationParse(_)));
        assert_matches!(parse_duration("abc"), Err(Error::DurationParse(_)));
        assert_matches!(parse_duration("10x"), Err(Error::DurationParse(_)));
        assert_matches!(parse_duration("m10"), Err(Error::DurationParse(_)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(86400)), "1d");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
capacities:
  hot: 2
  warm: 4
default_ttl: 90s
maintenance_interval: 250ms
policy:
  maintenance_promotion_min_accesses: 3
"#;
        let config = CacheConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.capacities, TierCapacities::new(2, 4, DEFAULT_COLD_CAPACITY));
        assert_eq!(config.default_ttl, Duration::from_secs(90));
        assert_eq!(config.maintenance_interval, Duration::from_millis(250));
        assert_eq!(config.policy.maintenance_promotion_min_accesses, 3);
        assert_eq!(config.policy.hot_demotion_min_accesses, 1);
    }

    #[test]
    fn test_from_yaml_invalid() {
        assert_matches!(
            CacheConfig::from_yaml_str("default_ttl: soon"),
            Err(Error::ConfigParse(_))
        );
        assert_matches!(
            CacheConfig::from_yaml_str("capacities:\n  hot: 0\n"),
            Err(Error::InvalidConfiguration(_))
        );
    }

    #[test]
    fn test_yaml_roundtrip_uses_readable_durations() {
        let yaml = serde_yaml::to_string(&CacheConfig::default()).unwrap();
        assert!(yaml.contains("default_ttl: 1h"));
        assert!(yaml.contains("maintenance_interval: 1m"));
        assert_eq!(CacheConfig::from_yaml_str(&yaml).unwrap(), CacheConfig::default());
    }

    #[test]
    fn test_from_missing_file() {
        assert_matches!(
            CacheConfig::from_file("/nonexistent/tiercache.yaml"),
            Err(Error::Io(_))
        );
    }
}
