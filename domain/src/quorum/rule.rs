//! Quorum rules for signature thresholds
//!
//! This module defines how many member signatures a policy needs.

use serde::{Deserialize, Serialize};

/// Rule for determining how many members must sign
///
/// - `Any`: one member signature suffices
/// - `All`: every member must sign
/// - `Majority`: ⌈n/2⌉ + 1 must sign, capped at n
/// - `AtLeast(n)`: at least n members must sign
///
/// # Example
///
/// ```
/// use chanconf_domain::quorum::QuorumRule;
///
/// let rule = QuorumRule::Majority;
/// assert!(rule.is_satisfied(3, 4));  // ⌈4/2⌉ + 1 = 3
/// assert!(!rule.is_satisfied(2, 4));
/// assert!(!rule.is_satisfied(3, 5)); // ⌈5/2⌉ + 1 = 4
///
/// let strict = QuorumRule::All;
/// assert!(strict.is_satisfied(3, 3));
/// assert!(!strict.is_satisfied(2, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuorumRule {
    /// Any single member
    Any,

    /// ⌈n/2⌉ + 1 of the members
    #[default]
    Majority,

    /// Every member
    All,

    /// At least n members
    AtLeast(usize),
}

impl QuorumRule {
    /// Check if the rule is satisfied given distinct valid signatures and member count
    pub fn is_satisfied(&self, signatures: usize, members: usize) -> bool {
        if members == 0 {
            return false;
        }
        signatures >= self.min_signatures(members)
    }

    /// Minimum distinct member signatures needed given a member count
    ///
    /// Always at least one: a configuration update is never authorized
    /// without a signature. A majority of one or two members is every member.
    pub fn min_signatures(&self, members: usize) -> usize {
        match self {
            QuorumRule::Any => 1,
            QuorumRule::Majority => (members.div_ceil(2) + 1).min(members).max(1),
            QuorumRule::All => members.max(1),
            QuorumRule::AtLeast(n) => (*n).max(1),
        }
    }

    /// Get a human-readable description of this rule
    pub fn description(&self) -> String {
        match self {
            QuorumRule::Any => "any member".to_string(),
            QuorumRule::Majority => "majority (half rounded up, plus one)".to_string(),
            QuorumRule::All => "all members".to_string(),
            QuorumRule::AtLeast(n) => format!("at least {} members", n),
        }
    }
}

impl std::fmt::Display for QuorumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::str::FromStr for QuorumRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(QuorumRule::Any),
            "majority" => Ok(QuorumRule::Majority),
            "all" | "unanimous" => Ok(QuorumRule::All),
            s if s.starts_with("atleast:") || s.starts_with("at_least:") => {
                let n: usize = s
                    .split(':')
                    .nth(1)
                    .ok_or("Missing number after atleast:")?
                    .parse()
                    .map_err(|_| "Invalid number for atleast")?;
                Ok(QuorumRule::AtLeast(n))
            }
            _ => Err(format!(
                "Unknown quorum rule: {}. Valid: any, majority, all, atleast:N",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_rule() {
        let rule = QuorumRule::Majority;

        // 3 members: need all 3
        assert!(!rule.is_satisfied(2, 3));
        assert!(rule.is_satisfied(3, 3));

        // 4 members: need 3
        assert!(!rule.is_satisfied(2, 4));
        assert!(rule.is_satisfied(3, 4));

        // 5 members: need 4
        assert!(!rule.is_satisfied(3, 5));
        assert!(rule.is_satisfied(4, 5));

        // 7 members: need 5
        assert!(!rule.is_satisfied(4, 7));
        assert!(rule.is_satisfied(5, 7));
    }

    #[test]
    fn test_all_rule() {
        let rule = QuorumRule::All;

        assert!(!rule.is_satisfied(2, 3));
        assert!(rule.is_satisfied(3, 3));
        assert!(rule.is_satisfied(1, 1));
    }

    #[test]
    fn test_any_rule() {
        assert!(QuorumRule::Any.is_satisfied(1, 7));
        assert!(!QuorumRule::Any.is_satisfied(0, 7));
    }

    #[test]
    fn test_at_least_rule() {
        let rule = QuorumRule::AtLeast(2);

        assert!(!rule.is_satisfied(1, 5));
        assert!(rule.is_satisfied(2, 5));
        assert_eq!(QuorumRule::AtLeast(0).min_signatures(5), 1);
    }

    #[test]
    fn test_zero_members() {
        assert!(!QuorumRule::Any.is_satisfied(0, 0));
        assert!(!QuorumRule::Majority.is_satisfied(0, 0));
        assert!(!QuorumRule::All.is_satisfied(0, 0));
    }

    #[test]
    fn test_min_signatures() {
        assert_eq!(QuorumRule::Majority.min_signatures(1), 1);
        assert_eq!(QuorumRule::Majority.min_signatures(2), 2);
        assert_eq!(QuorumRule::Majority.min_signatures(3), 3);
        assert_eq!(QuorumRule::Majority.min_signatures(4), 3);
        assert_eq!(QuorumRule::Majority.min_signatures(5), 4);
        assert_eq!(QuorumRule::Majority.min_signatures(6), 4);
        assert_eq!(QuorumRule::Majority.min_signatures(7), 5);
        assert_eq!(QuorumRule::All.min_signatures(3), 3);
        assert_eq!(QuorumRule::Any.min_signatures(3), 1);
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!("MAJORITY".parse::<QuorumRule>().ok(), Some(QuorumRule::Majority));
        assert_eq!("all".parse::<QuorumRule>().ok(), Some(QuorumRule::All));
        assert_eq!("any".parse::<QuorumRule>().ok(), Some(QuorumRule::Any));
        assert_eq!(
            "atleast:2".parse::<QuorumRule>().ok(),
            Some(QuorumRule::AtLeast(2))
        );
        assert!("sometimes".parse::<QuorumRule>().is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(QuorumRule::default(), QuorumRule::Majority);
    }
}
