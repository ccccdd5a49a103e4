//! Greedy, tier-priority placement of participants into groups.
//!
//! Regular members are placed first, latecomers second. Within each pass the tiers are
//! walked in `PRIORITY_TABLE` order and every member goes to the group with the smallest
//! placement key.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::group::Group;
use crate::model::{Gender, Participant, Pool, Tier};
use crate::scorer;
use crate::stats::GroupStats;

/// What a tier competes against when choosing a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spread {
    /// Count of the participant's own tier in the group.
    OwnTier,
    /// Running tally of several tiers together.
    Combined(&'static [i32]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRule {
    pub tier: Tier,
    pub spread: Spread,
}

const TOP_TWO: &[i32] = &[6, 5];

/// Placement order. Tiers not listed follow by descending level, `Unknown` goes last.
pub const PRIORITY_TABLE: &[TierRule] = &[
    TierRule {
        tier: Tier::Level(6),
        spread: Spread::Combined(TOP_TWO),
    },
    TierRule {
        tier: Tier::Level(1),
        spread: Spread::OwnTier,
    },
    TierRule {
        tier: Tier::Level(5),
        spread: Spread::Combined(TOP_TWO),
    },
    TierRule {
        tier: Tier::Level(4),
        spread: Spread::OwnTier,
    },
    TierRule {
        tier: Tier::Level(3),
        spread: Spread::OwnTier,
    },
    TierRule {
        tier: Tier::Level(2),
        spread: Spread::OwnTier,
    },
];

pub fn spread_rule(tier: Tier) -> Spread {
    PRIORITY_TABLE
        .iter()
        .find(|rule| rule.tier == tier)
        .map(|rule| rule.spread)
        .unwrap_or(Spread::OwnTier)
}

pub fn spread_count(stats: &GroupStats, tier: Tier) -> usize {
    match spread_rule(tier) {
        Spread::OwnTier => stats.tier_count(tier),
        Spread::Combined(levels) => levels
            .iter()
            .map(|&level| stats.tier_count(Tier::Level(level)))
            .sum(),
    }
}

/// The order in which the tiers present in a pass are placed.
pub fn tier_order(present: &BTreeSet<Tier>) -> Vec<Tier> {
    let mut order: Vec<Tier> = PRIORITY_TABLE
        .iter()
        .map(|rule| rule.tier)
        .filter(|tier| present.contains(tier))
        .collect();

    let mut rest: Vec<Tier> = present
        .iter()
        .copied()
        .filter(|tier| *tier != Tier::Unknown && !order.contains(tier))
        .collect();
    rest.sort_by(|a, b| b.cmp(a));
    order.extend(rest);

    if present.contains(&Tier::Unknown) {
        order.push(Tier::Unknown);
    }
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Regular,
    Late,
}

/// Composite key for one candidate group. Smaller is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementKey {
    pub spread: usize,
    /// Only populated during the late pass.
    pub late: usize,
    pub size: usize,
    pub deviation: f64,
}

impl PlacementKey {
    pub fn for_candidate(
        stats: &GroupStats,
        participant: &Participant,
        pass: Pass,
        target: (usize, usize),
    ) -> Self {
        let (male, female) = match participant.gender {
            Gender::Male => (stats.male + 1, stats.female),
            Gender::Female => (stats.male, stats.female + 1),
        };
        PlacementKey {
            spread: spread_count(stats, participant.tier),
            late: match pass {
                Pass::Regular => 0,
                Pass::Late => stats.late,
            },
            size: stats.size,
            deviation: scorer::deviation(male, female, target),
        }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.spread
            .cmp(&other.spread)
            .then(self.late.cmp(&other.late))
            .then(self.size.cmp(&other.size))
            .then(self.deviation.total_cmp(&other.deviation))
    }
}

/// Size quota that keeps group sizes within one of each other.
#[derive(Debug, Clone, Copy)]
struct Quota {
    base: usize,
    extra: usize,
    filled_extra: usize,
}

impl Quota {
    fn new(pool_size: usize, group_count: usize) -> Self {
        Quota {
            base: pool_size / group_count,
            extra: pool_size % group_count,
            filled_extra: 0,
        }
    }

    fn allows(&self, size: usize) -> bool {
        size < self.base || (size == self.base && self.filled_extra < self.extra)
    }

    fn record(&mut self, new_size: usize) {
        if new_size == self.base + 1 {
            self.filled_extra += 1;
        }
    }
}

/// Place every participant of `pool` into `group_count` groups.
/// `group_count` must already be clamped to the pool size.
pub fn assign<R: Rng + ?Sized>(pool: &Pool, group_count: usize, rng: &mut R) -> Vec<Group> {
    if group_count == 0 || pool.is_empty() {
        return Vec::new();
    }

    let target = pool.gender_counts();
    let mut groups: Vec<Group> = (1..=group_count).map(Group::new).collect();
    let mut quota = Quota::new(pool.len(), group_count);

    for pass in [Pass::Regular, Pass::Late] {
        let members: Vec<&Participant> = pool
            .participants()
            .iter()
            .filter(|p| p.late == (pass == Pass::Late))
            .collect();
        if members.is_empty() {
            continue;
        }

        let present: BTreeSet<Tier> = members.iter().map(|p| p.tier).collect();
        for tier in tier_order(&present) {
            let mut cohort: Vec<&Participant> =
                members.iter().copied().filter(|p| p.tier == tier).collect();
            cohort.shuffle(rng);

            for participant in cohort {
                let index = choose_group(&groups, &quota, participant, pass, target, rng);
                debug!(
                    id = %participant.id,
                    tier = %participant.tier,
                    group = %groups[index].label,
                    ?pass,
                    "placed participant"
                );
                groups[index].add_member(participant.clone());
                quota.record(groups[index].len());
            }
        }
        info!(?pass, placed = members.len(), "assignment pass finished");
    }

    groups
}

fn choose_group<R: Rng + ?Sized>(
    groups: &[Group],
    quota: &Quota,
    participant: &Participant,
    pass: Pass,
    target: (usize, usize),
    rng: &mut R,
) -> usize {
    let mut candidates: Vec<usize> = (0..groups.len())
        .filter(|&i| quota.allows(groups[i].len()))
        .collect();
    if candidates.is_empty() {
        candidates = (0..groups.len()).collect();
    }
    // Shuffling first makes the final tie-break random: min_by keeps the first minimum.
    candidates.shuffle(rng);

    candidates
        .into_iter()
        .map(|i| {
            (
                i,
                PlacementKey::for_candidate(&groups[i].stats, participant, pass, target),
            )
        })
        .min_by(|(_, a), (_, b)| a.compare(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
