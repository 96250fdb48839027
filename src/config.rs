//! Explicit configuration, read from the environment once at start-up and
//! passed to the components that need it.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::RetryPolicy;
use crate::matcher::DetectionPolicy;
use crate::polyline::VALHALLA_PRECISION;

/// Distance threshold used when a request gives none (or zero): 20 m.
pub const DEFAULT_DISTANCE_THRESHOLD_KM: f64 = 0.02;

pub const DEFAULT_COSTING: &str = "pedestrian";

pub const DEFAULT_VALHALLA_URL: &str = "http://localhost:8002";

/// Matching defaults and provider-call parameters.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub default_policy: DetectionPolicy,
    pub default_threshold_km: f64,
    pub default_costing: String,
    pub shape_precision: u32,
    /// `shape_match` mode sent with trace calls.
    pub shape_match: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            default_policy: DetectionPolicy::Distance,
            default_threshold_km: DEFAULT_DISTANCE_THRESHOLD_KM,
            default_costing: DEFAULT_COSTING.to_string(),
            shape_precision: VALHALLA_PRECISION,
            shape_match: "map_snap".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyConfig {
    Header { name: String, key: String },
    QueryParam { name: String, key: String },
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Applies to each outbound call independently.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
    pub api_key: Option<ApiKeyConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VALHALLA_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            api_key: None,
        }
    }
}

/// Where the obstacle catalogue is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HazardSource {
    File(PathBuf),
    S3 { bucket: String, key: String },
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub hazards: Option<HazardSource>,
    pub matcher: MatcherConfig,
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = ProviderConfig::default();
        let api_key = match (
            var("VALHALLA_API_KEY"),
            var("VALHALLA_API_KEY_PARAM"),
            var("VALHALLA_API_KEY_HEADER"),
        ) {
            (None, _, _) => None,
            (Some(_), Some(_), Some(_)) => {
                bail!("set only one of VALHALLA_API_KEY_PARAM and VALHALLA_API_KEY_HEADER")
            }
            (Some(key), _, Some(name)) => Some(ApiKeyConfig::Header { name, key }),
            (Some(key), param, None) => Some(ApiKeyConfig::QueryParam {
                name: param.unwrap_or_else(|| "api_key".to_string()),
                key,
            }),
        };

        let provider = ProviderConfig {
            base_url: var("VALHALLA_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(parse_or(&var, "ROUTING_TIMEOUT_SECS", 30)?),
            connect_timeout: Duration::from_secs(parse_or(&var, "ROUTING_CONNECT_TIMEOUT_SECS", 10)?),
            retry: RetryPolicy {
                max_retries: parse_or(&var, "ROUTING_MAX_RETRIES", defaults.retry.max_retries)?,
                backoff: Duration::from_millis(parse_or(&var, "ROUTING_RETRY_BACKOFF_MS", 250)?),
            },
            api_key,
        };

        let hazards = match (
            var("OBSTACLE_CATALOGUE_PATH"),
            var("OBSTACLE_BUCKET"),
            var("OBSTACLE_KEY"),
        ) {
            (Some(path), None, None) => Some(HazardSource::File(path.into())),
            (None, Some(bucket), key) => Some(HazardSource::S3 {
                bucket,
                key: key.unwrap_or_else(|| "obstacles.json".to_string()),
            }),
            (None, None, None) => None,
            (None, None, Some(_)) => bail!("OBSTACLE_KEY requires OBSTACLE_BUCKET"),
            (Some(_), _, _) => {
                bail!("OBSTACLE_CATALOGUE_PATH cannot be combined with OBSTACLE_BUCKET or OBSTACLE_KEY")
            }
        };

        Ok(Self {
            provider,
            hazards,
            matcher: MatcherConfig::default(),
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has invalid value '{raw}'")),
        None => Ok(default),
    }
}
