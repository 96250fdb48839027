use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule deciding whether an obstacle is on a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPolicy {
    /// Way-id match only.
    Nodes,
    /// Geometric proximity only.
    #[default]
    Distance,
    /// Way-id match and within the distance threshold.
    Both,
}

impl DetectionPolicy {
    /// Whether traversed way ids must be fetched for this policy.
    pub fn uses_identifiers(self) -> bool {
        matches!(self, DetectionPolicy::Nodes | DetectionPolicy::Both)
    }

    /// Combines the two signals. Each is evaluated only when needed.
    pub fn admits(self, by_identifier: impl FnOnce() -> bool, near: impl FnOnce() -> bool) -> bool {
        match self {
            DetectionPolicy::Nodes => by_identifier(),
            DetectionPolicy::Distance => near(),
            DetectionPolicy::Both => by_identifier() && near(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionPolicy::Nodes => "nodes",
            DetectionPolicy::Distance => "distance",
            DetectionPolicy::Both => "both",
        }
    }
}

impl fmt::Display for DetectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown detection method '{0}' (expected nodes, distance or both)")]
pub struct UnknownPolicy(pub String);

impl FromStr for DetectionPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nodes" => Ok(DetectionPolicy::Nodes),
            "distance" => Ok(DetectionPolicy::Distance),
            "both" => Ok(DetectionPolicy::Both),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("nodes".parse(), Ok(DetectionPolicy::Nodes));
        assert_eq!(" Distance ".parse(), Ok(DetectionPolicy::Distance));
        assert_eq!("BOTH".parse(), Ok(DetectionPolicy::Both));
        assert!("either".parse::<DetectionPolicy>().is_err());
    }

    #[test]
    fn test_both_requires_both_signals() {
        let p = DetectionPolicy::Both;
        assert!(p.admits(|| true, || true));
        assert!(!p.admits(|| true, || false));
        assert!(!p.admits(|| false, || true));
    }

    #[test]
    fn test_single_signal_policies_ignore_the_other() {
        assert!(DetectionPolicy::Nodes.admits(|| true, || unreachable!()));
        assert!(DetectionPolicy::Distance.admits(|| unreachable!(), || true));
    }

    #[test]
    fn test_identifier_fetch_needed() {
        assert!(DetectionPolicy::Nodes.uses_identifiers());
        assert!(DetectionPolicy::Both.uses_identifiers());
        assert!(!DetectionPolicy::Distance.uses_identifiers());
    }

    #[test]
    fn test_default_is_distance() {
        assert_eq!(DetectionPolicy::default(), DetectionPolicy::Distance);
        assert_eq!(DetectionPolicy::Distance.to_string(), "distance");
    }
}
