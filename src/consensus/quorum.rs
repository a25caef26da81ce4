//! Quorum policy for the comparator.

use serde::{Deserialize, Serialize};

/// How many runs must agree before a hash group wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// Every supplied result must agree
    #[default]
    Unanimous,
    /// At least this many results must agree (values below 1 count as 1)
    AtLeast(usize),
    /// Strictly more than half of the supplied results must agree
    Majority,
}

impl QuorumPolicy {
    /// Group size needed for consensus over `total` results.
    ///
    /// May exceed `total` for `AtLeast`, in which case consensus is
    /// unreachable.
    pub fn required(&self, total: usize) -> usize {
        match self {
            QuorumPolicy::Unanimous => total,
            QuorumPolicy::AtLeast(n) => (*n).max(1),
            QuorumPolicy::Majority => total / 2 + 1,
        }
    }
}

impl std::fmt::Display for QuorumPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuorumPolicy::Unanimous => write!(f, "unanimous"),
            QuorumPolicy::AtLeast(n) => write!(f, "at_least({n})"),
            QuorumPolicy::Majority => write!(f, "majority"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unanimous() {
        assert_eq!(QuorumPolicy::default(), QuorumPolicy::Unanimous);
        assert_eq!(QuorumPolicy::default().required(5), 5);
    }

    #[test]
    fn test_at_least() {
        assert_eq!(QuorumPolicy::AtLeast(2).required(3), 2);
        assert_eq!(QuorumPolicy::AtLeast(0).required(3), 1);
        assert_eq!(QuorumPolicy::AtLeast(4).required(3), 4);
    }

    #[test]
    fn test_majority() {
        assert_eq!(QuorumPolicy::Majority.required(1), 1);
        assert_eq!(QuorumPolicy::Majority.required(4), 3);
        assert_eq!(QuorumPolicy::Majority.required(5), 3);
    }

    #[test]
    fn test_serde_form() {
        let json = serde_json::to_string(&QuorumPolicy::AtLeast(2)).unwrap();
        assert_eq!(json, r#"{"at_least":2}"#);
        let back: QuorumPolicy = serde_json::from_str(r#""majority""#).unwrap();
        assert_eq!(back, QuorumPolicy::Majority);
    }
}
