//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use h3o::Resolution;
use zeus_core::{CoverMode, MatchPolicy, DEFAULT_RESOLUTION};
use zeus_opensky::{BoundingBox, DEFAULT_OPENSKY_URL};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub opensky_url: String,
    pub bounding_box: BoundingBox,
    /// Target spacing between successful polls
    pub poll_interval: Duration,
    /// Ceiling for the failure backoff
    pub backoff_max: Duration,
    pub http_timeout: Duration,
    /// JSON zone catalog; the built-in catalog is used when unset
    pub zones_file: Option<PathBuf>,
    pub cell_resolution: Resolution,
    pub zone_cover: CoverMode,
    pub match_policy: MatchPolicy,
    /// Enriched batches buffered per viewer before it starts skipping
    pub broadcast_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparseable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse_secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        let bounding_box = match lookup("ZEUS_BBOX") {
            Some(value) => BoundingBox::parse(&value).unwrap_or_else(|| {
                tracing::warn!("Invalid ZEUS_BBOX {:?}, using California", value);
                BoundingBox::CALIFORNIA
            }),
            None => BoundingBox::CALIFORNIA,
        };

        let cell_resolution = lookup("ZEUS_CELL_RESOLUTION")
            .and_then(|s| s.trim().parse::<u8>().ok())
            .and_then(|level| Resolution::try_from(level).ok())
            .unwrap_or(DEFAULT_RESOLUTION);

        let match_policy = match lookup("ZEUS_MATCH_POLICY") {
            Some(value) => value.parse::<MatchPolicy>().unwrap_or_else(|err| {
                tracing::warn!("{}, using first match", err);
                MatchPolicy::FirstMatch
            }),
            None => MatchPolicy::FirstMatch,
        };

        let zone_cover = match lookup("ZEUS_ZONE_COVER") {
            Some(value) => value.parse::<CoverMode>().unwrap_or_else(|err| {
                tracing::warn!("{}, using vertex cover", err);
                CoverMode::Vertices
            }),
            None => CoverMode::Vertices,
        };

        Self {
            server_port: lookup("ZEUS_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            opensky_url: lookup("OPENSKY_URL").unwrap_or_else(|| DEFAULT_OPENSKY_URL.to_string()),
            bounding_box,
            poll_interval: parse_secs("ZEUS_POLL_INTERVAL_SECS", 10).max(Duration::from_secs(1)),
            backoff_max: parse_secs("ZEUS_BACKOFF_MAX_SECS", 120),
            http_timeout: parse_secs("ZEUS_HTTP_TIMEOUT_SECS", 15).max(Duration::from_secs(1)),
            zones_file: lookup("ZEUS_ZONES_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            cell_resolution,
            zone_cover,
            match_policy,
            broadcast_capacity: lookup("ZEUS_BROADCAST_CAPACITY")
                .and_then(|s| s.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.opensky_url, DEFAULT_OPENSKY_URL);
        assert_eq!(config.bounding_box, BoundingBox::CALIFORNIA);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.cell_resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.zone_cover, CoverMode::Vertices);
        assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.zones_file.is_none());
        assert_eq!(config.broadcast_capacity, 64);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("ZEUS_PORT", "9100"),
            ("ZEUS_BBOX", "37.0,-123.0,38.5,-121.0"),
            ("ZEUS_POLL_INTERVAL_SECS", "5"),
            ("ZEUS_CELL_RESOLUTION", "7"),
            ("ZEUS_MATCH_POLICY", "highest"),
            ("ZEUS_ZONE_COVER", "fill"),
            ("ZEUS_ZONES_FILE", "/etc/zeus/zones.json"),
        ]);
        assert_eq!(config.server_port, 9100);
        assert_eq!(config.bounding_box.lamin, 37.0);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.cell_resolution, Resolution::Seven);
        assert_eq!(config.match_policy, MatchPolicy::HighestSeverity);
        assert_eq!(config.zone_cover, CoverMode::Fill);
        assert_eq!(config.zones_file, Some(PathBuf::from("/etc/zeus/zones.json")));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("ZEUS_BBOX", "nonsense"),
            ("ZEUS_CELL_RESOLUTION", "42"),
            ("ZEUS_MATCH_POLICY", "loudest"),
            ("ZEUS_POLL_INTERVAL_SECS", "0"),
            ("ZEUS_BROADCAST_CAPACITY", "0"),
            ("ZEUS_ZONE_COVER", "everything"),
        ]);
        assert_eq!(config.bounding_box, BoundingBox::CALIFORNIA);
        assert_eq!(config.cell_resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.zone_cover, CoverMode::Vertices);
    }

    #[test]
    fn zero_http_timeout_is_clamped() {
        let config = config_from(&[("ZEUS_HTTP_TIMEOUT_SECS", "0")]);
        assert_eq!(config.http_timeout, Duration::from_secs(1));
    }
}
