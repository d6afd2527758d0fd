//! Ordered threshold ladders
//!
//! A ladder maps a count onto a tagged tier. `AtLeast` ladders pick the
//! highest threshold the value reaches (segment and value tiers); `AtMost`
//! ladders pick the lowest bound the value stays within (churn and depth
//! bands). Anything outside every step lands in the fallback tier.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Comparison used by a ladder's thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// `value >= threshold`, evaluated from the highest threshold down
    AtLeast,
    /// `value <= threshold`, evaluated from the lowest threshold up
    AtMost,
}

/// One (threshold, tier) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStep<T> {
    pub threshold: u64,
    pub tier: T,
}

/// Inclusive count range covered by a tier; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Ascending list of thresholds plus the tier for values outside all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLadder<T> {
    pub bound: Bound,
    pub steps: Vec<TierStep<T>>,
    pub fallback: T,
}

impl<T: Copy + PartialEq> TierLadder<T> {
    pub fn at_least(steps: &[(u64, T)], fallback: T) -> Self {
        Self::build(Bound::AtLeast, steps, fallback)
    }

    pub fn at_most(steps: &[(u64, T)], fallback: T) -> Self {
        Self::build(Bound::AtMost, steps, fallback)
    }

    fn build(bound: Bound, steps: &[(u64, T)], fallback: T) -> Self {
        Self {
            bound,
            steps: steps
                .iter()
                .map(|&(threshold, tier)| TierStep { threshold, tier })
                .collect(),
            fallback,
        }
    }

    /// Reject ladders that would silently misclassify
    pub fn validate(&self, name: &str, expected: Bound) -> Result<(), ComputeError> {
        if self.bound != expected {
            return Err(ComputeError::ConfigError(format!(
                "{name}: expected {expected:?} thresholds, got {:?}",
                self.bound
            )));
        }
        if self.steps.is_empty() {
            return Err(ComputeError::ConfigError(format!(
                "{name}: at least one threshold is required"
            )));
        }
        for pair in self.steps.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(ComputeError::ConfigError(format!(
                    "{name}: thresholds must be strictly ascending ({} then {})",
                    pair[0].threshold, pair[1].threshold
                )));
            }
        }
        let tiers = self.tiers();
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].contains(tier) {
                return Err(ComputeError::ConfigError(format!(
                    "{name}: each tier may appear only once"
                )));
            }
        }
        Ok(())
    }

    pub fn classify(&self, value: u64) -> T {
        let hit = match self.bound {
            Bound::AtLeast => self.steps.iter().rev().find(|s| value >= s.threshold),
            Bound::AtMost => self.steps.iter().find(|s| value <= s.threshold),
        };
        hit.map(|s| s.tier).unwrap_or(self.fallback)
    }

    /// Every tier this ladder can produce, lowest count range first
    pub fn tiers(&self) -> Vec<T> {
        let stepped = self.steps.iter().map(|s| s.tier);
        match self.bound {
            Bound::AtLeast => std::iter::once(self.fallback).chain(stepped).collect(),
            Bound::AtMost => stepped.chain(std::iter::once(self.fallback)).collect(),
        }
    }

    /// Inclusive count range that classifies as `tier`
    pub fn range_of(&self, tier: T) -> Option<TierRange> {
        let thresholds: Vec<u64> = self.steps.iter().map(|s| s.threshold).collect();
        let last = thresholds.len().checked_sub(1)?;

        if tier == self.fallback {
            return Some(match self.bound {
                Bound::AtLeast => TierRange {
                    min: None,
                    max: thresholds[0].checked_sub(1),
                },
                Bound::AtMost => TierRange {
                    min: thresholds[last].checked_add(1),
                    max: None,
                },
            });
        }

        let i = self.steps.iter().position(|s| s.tier == tier)?;
        Some(match self.bound {
            Bound::AtLeast => TierRange {
                min: Some(thresholds[i]),
                max: thresholds.get(i + 1).map(|next| next - 1),
            },
            Bound::AtMost => TierRange {
                min: i.checked_sub(1).map(|prev| thresholds[prev] + 1),
                max: Some(thresholds[i]),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChurnStatus, UserSegment};

    fn segments() -> TierLadder<UserSegment> {
        TierLadder::at_least(
            &[
                (10, UserSegment::CasualUser),
                (50, UserSegment::RegularUser),
                (100, UserSegment::PowerUser),
            ],
            UserSegment::NewUser,
        )
    }

    fn churn() -> TierLadder<ChurnStatus> {
        TierLadder::at_most(
            &[
                (7, ChurnStatus::Active),
                (30, ChurnStatus::AtRisk),
                (90, ChurnStatus::Churning),
            ],
            ChurnStatus::Churned,
        )
    }

    #[test]
    fn test_at_least_boundary_is_inclusive() {
        let ladder = segments();
        assert_eq!(ladder.classify(1), UserSegment::NewUser);
        assert_eq!(ladder.classify(9), UserSegment::NewUser);
        assert_eq!(ladder.classify(10), UserSegment::CasualUser);
        assert_eq!(ladder.classify(49), UserSegment::CasualUser);
        assert_eq!(ladder.classify(50), UserSegment::RegularUser);
        assert_eq!(ladder.classify(100), UserSegment::PowerUser);
        assert_eq!(ladder.classify(10_000), UserSegment::PowerUser);
    }

    #[test]
    fn test_at_most_boundary_is_inclusive() {
        let ladder = churn();
        assert_eq!(ladder.classify(0), ChurnStatus::Active);
        assert_eq!(ladder.classify(7), ChurnStatus::Active);
        assert_eq!(ladder.classify(8), ChurnStatus::AtRisk);
        assert_eq!(ladder.classify(30), ChurnStatus::AtRisk);
        assert_eq!(ladder.classify(90), ChurnStatus::Churning);
        assert_eq!(ladder.classify(91), ChurnStatus::Churned);
    }

    #[test]
    fn test_tiers_lowest_first() {
        assert_eq!(
            segments().tiers(),
            vec![
                UserSegment::NewUser,
                UserSegment::CasualUser,
                UserSegment::RegularUser,
                UserSegment::PowerUser
            ]
        );
        assert_eq!(
            churn().tiers(),
            vec![
                ChurnStatus::Active,
                ChurnStatus::AtRisk,
                ChurnStatus::Churning,
                ChurnStatus::Churned
            ]
        );
    }

    #[test]
    fn test_ranges() {
        let ladder = churn();
        assert_eq!(
            ladder.range_of(ChurnStatus::Active),
            Some(TierRange { min: None, max: Some(7) })
        );
        assert_eq!(
            ladder.range_of(ChurnStatus::AtRisk),
            Some(TierRange { min: Some(8), max: Some(30) })
        );
        assert_eq!(
            ladder.range_of(ChurnStatus::Churned),
            Some(TierRange { min: Some(91), max: None })
        );

        let ladder = segments();
        assert_eq!(
            ladder.range_of(UserSegment::NewUser),
            Some(TierRange { min: None, max: Some(9) })
        );
        assert_eq!(
            ladder.range_of(UserSegment::RegularUser),
            Some(TierRange { min: Some(50), max: Some(99) })
        );
        assert_eq!(
            ladder.range_of(UserSegment::PowerUser),
            Some(TierRange { min: Some(100), max: None })
        );
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(segments().validate("user_segments", Bound::AtLeast).is_ok());
        assert!(churn().validate("churn_bands", Bound::AtMost).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let ladder: TierLadder<UserSegment> = TierLadder::at_least(&[], UserSegment::NewUser);
        let err = ladder.validate("user_segments", Bound::AtLeast).unwrap_err();
        assert!(matches!(err, ComputeError::ConfigError(_)));
        assert!(err.to_string().contains("user_segments"));
    }

    #[test]
    fn test_validate_rejects_unordered_and_duplicates() {
        let unordered = TierLadder::at_least(
            &[(50, UserSegment::RegularUser), (10, UserSegment::CasualUser)],
            UserSegment::NewUser,
        );
        assert!(unordered.validate("s", Bound::AtLeast).is_err());

        let repeated_threshold = TierLadder::at_least(
            &[(10, UserSegment::CasualUser), (10, UserSegment::RegularUser)],
            UserSegment::NewUser,
        );
        assert!(repeated_threshold.validate("s", Bound::AtLeast).is_err());

        let repeated_tier = TierLadder::at_least(
            &[(10, UserSegment::CasualUser), (20, UserSegment::NewUser)],
            UserSegment::NewUser,
        );
        assert!(repeated_tier.validate("s", Bound::AtLeast).is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_bound() {
        assert!(churn().validate("churn_bands", Bound::AtLeast).is_err());
    }
}
