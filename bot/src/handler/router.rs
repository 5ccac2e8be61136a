//! Maps a member's highest privilege tier to the one thread they're
//! allowed to post in.

use crate::errors::{Error, Result};

use serenity::model::id::{ChannelId, RoleId};
use std::collections::HashSet;

pub const TIER_COUNT: usize = 6;

/// Bijection between the six tiers and their threads. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleThreadMapping {
    roles: [RoleId; TIER_COUNT],
    threads: [ChannelId; TIER_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allowed,
    Misrouted(ChannelId),
}

impl RoleThreadMapping {
    /// `pairs[tier]` holds the role and thread for that tier. Both the roles
    /// and the threads must be distinct so the mapping works in both
    /// directions.
    pub fn new(pairs: [(RoleId, ChannelId); TIER_COUNT]) -> Result<RoleThreadMapping> {
        let roles = pairs.map(|(role, _)| role);
        let threads = pairs.map(|(_, thread)| thread);

        if roles.iter().collect::<HashSet<_>>().len() != TIER_COUNT {
            return Err(Error::Config(
                "each tier must have a different role".to_string(),
            ));
        }
        if threads.iter().collect::<HashSet<_>>().len() != TIER_COUNT {
            return Err(Error::Config(
                "each tier must have a different thread".to_string(),
            ));
        }

        Ok(RoleThreadMapping { roles, threads })
    }

    #[inline]
    pub const fn thread_for_tier(&self, tier: usize) -> ChannelId {
        self.threads[tier]
    }

    #[inline]
    pub const fn role_for_tier(&self, tier: usize) -> RoleId {
        self.roles[tier]
    }

    #[inline]
    pub fn tier_for_thread(&self, thread: ChannelId) -> Option<usize> {
        self.threads.iter().position(|t| *t == thread)
    }
}

#[derive(Debug)]
pub struct Router {
    mapping: RoleThreadMapping,
    ignored_roles: HashSet<RoleId>,
}

impl Router {
    pub const fn new(mapping: RoleThreadMapping, ignored_roles: HashSet<RoleId>) -> Router {
        Router {
            mapping,
            ignored_roles,
        }
    }

    #[inline]
    pub const fn mapping(&self) -> &RoleThreadMapping {
        &self.mapping
    }

    /// Scans from the highest tier down and returns the first one whose role
    /// the member holds.
    pub fn highest_tier(&self, roles: &[RoleId]) -> Option<usize> {
        (0..TIER_COUNT)
            .rev()
            .find(|tier| roles.contains(&self.mapping.role_for_tier(*tier)))
    }

    pub fn route(&self, roles: &[RoleId], current: ChannelId) -> RouteDecision {
        if roles.iter().any(|role| self.ignored_roles.contains(role)) {
            return RouteDecision::Allowed;
        }

        match self.highest_tier(roles) {
            // no tier role, nothing to enforce
            None => RouteDecision::Allowed,
            Some(tier) => {
                let expected = self.mapping.thread_for_tier(tier);
                if expected == current {
                    RouteDecision::Allowed
                } else {
                    RouteDecision::Misrouted(expected)
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn mapping() -> RoleThreadMapping {
        let mut pairs = [(RoleId(0), ChannelId(0)); TIER_COUNT];
        for (tier, pair) in pairs.iter_mut().enumerate() {
            *pair = (RoleId(100 + tier as u64), ChannelId(200 + tier as u64));
        }
        RoleThreadMapping::new(pairs).unwrap()
    }

    fn router() -> Router {
        Router::new(mapping(), HashSet::from([RoleId(999)]))
    }

    #[test]
    fn test_mapping_both_directions() {
        let mapping = mapping();
        for tier in 0..TIER_COUNT {
            assert_eq!(
                mapping.tier_for_thread(mapping.thread_for_tier(tier)),
                Some(tier)
            );
        }
        assert_eq!(mapping.tier_for_thread(ChannelId(1)), None);
    }

    #[test]
    fn test_mapping_rejects_duplicate_role() {
        let mut pairs = [(RoleId(0), ChannelId(0)); TIER_COUNT];
        for (tier, pair) in pairs.iter_mut().enumerate() {
            *pair = (RoleId(100), ChannelId(200 + tier as u64));
        }
        assert!(matches!(
            RoleThreadMapping::new(pairs),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_tier_in_own_thread_allowed() {
        assert_eq!(
            router().route(&[RoleId(103)], ChannelId(203)),
            RouteDecision::Allowed
        );
    }

    #[test]
    fn test_tier_in_other_thread_misrouted() {
        let router = router();
        for thread in [200, 201, 202, 204, 205] {
            assert_eq!(
                router.route(&[RoleId(103)], ChannelId(thread)),
                RouteDecision::Misrouted(ChannelId(203))
            );
        }
    }

    #[test]
    fn test_highest_tier_wins() {
        let router = router();
        let roles = [RoleId(101), RoleId(104), RoleId(50)];
        assert_eq!(router.highest_tier(&roles), Some(4));
        assert_eq!(
            router.route(&roles, ChannelId(201)),
            RouteDecision::Misrouted(ChannelId(204))
        );
    }

    #[test]
    fn test_no_tier_role_passes() {
        assert_eq!(
            router().route(&[RoleId(50)], ChannelId(203)),
            RouteDecision::Allowed
        );
        assert_eq!(router().route(&[], ChannelId(1)), RouteDecision::Allowed);
    }

    #[test]
    fn test_ignored_role_skips_enforcement() {
        assert_eq!(
            router().route(&[RoleId(103), RoleId(999)], ChannelId(200)),
            RouteDecision::Allowed
        );
    }
}
