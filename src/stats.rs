use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Gender, Participant, Tier};
use crate::scorer;

/// Aggregates for one group. Always a pure function of the group's members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub size: usize,
    pub tiers: BTreeMap<Tier, usize>,
    pub male: usize,
    pub female: usize,
    pub late: usize,
}

impl GroupStats {
    pub fn from_members(members: &[Participant]) -> Self {
        let mut stats = GroupStats::default();
        for member in members {
            stats.apply_insert(member);
        }
        stats
    }

    pub fn apply_insert(&mut self, participant: &Participant) {
        self.size += 1;
        *self.tiers.entry(participant.tier).or_insert(0) += 1;
        match participant.gender {
            Gender::Male => self.male += 1,
            Gender::Female => self.female += 1,
        }
        if participant.late {
            self.late += 1;
        }
    }

    pub fn apply_remove(&mut self, participant: &Participant) {
        self.size -= 1;
        if let Some(count) = self.tiers.get_mut(&participant.tier) {
            *count -= 1;
            // Drop empty buckets so recomputed stats compare equal
            if *count == 0 {
                self.tiers.remove(&participant.tier);
            }
        }
        match participant.gender {
            Gender::Male => self.male -= 1,
            Gender::Female => self.female -= 1,
        }
        if participant.late {
            self.late -= 1;
        }
    }

    pub fn tier_count(&self, tier: Tier) -> usize {
        self.tiers.get(&tier).copied().unwrap_or(0)
    }

    pub fn gender_count(&self, gender: Gender) -> usize {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
        }
    }

    pub fn imbalance(&self) -> f64 {
        scorer::imbalance(self.male, self.female)
    }

    /// Imbalance the group would have after gaining one member of `gender`.
    pub fn imbalance_with(&self, gender: Gender) -> f64 {
        match gender {
            Gender::Male => scorer::imbalance(self.male + 1, self.female),
            Gender::Female => scorer::imbalance(self.male, self.female + 1),
        }
    }

    /// Imbalance after trading away a member of `out` for a member of `incoming`.
    pub fn imbalance_after_swap(&self, out: Gender, incoming: Gender) -> f64 {
        let (mut male, mut female) = (self.male, self.female);
        match out {
            Gender::Male => male -= 1,
            Gender::Female => female -= 1,
        }
        match incoming {
            Gender::Male => male += 1,
            Gender::Female => female += 1,
        }
        scorer::imbalance(male, female)
    }
}

/// Rebuild every group's stats by scanning membership.
pub fn recompute<'a, I>(groups: I) -> Vec<GroupStats>
where
    I: IntoIterator<Item = &'a [Participant]>,
{
    groups.into_iter().map(GroupStats::from_members).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Participant> {
        vec![
            Participant::new("S001", Tier::Level(6), Gender::Male),
            Participant::new("S002", Tier::Level(3), Gender::Female).late(),
            Participant::new("S003", Tier::Level(3), Gender::Male),
            Participant::new("S004", Tier::Unknown, Gender::Female),
        ]
    }

    #[test]
    fn test_apply_insert_counts_every_bucket() {
        let stats = GroupStats::from_members(&members());
        assert_eq!(stats.size, 4);
        assert_eq!(stats.tier_count(Tier::Level(3)), 2);
        assert_eq!(stats.tier_count(Tier::Level(6)), 1);
        assert_eq!(stats.tier_count(Tier::Unknown), 1);
        assert_eq!(stats.tier_count(Tier::Level(1)), 0);
        assert_eq!((stats.male, stats.female), (2, 2));
        assert_eq!(stats.late, 1);
        assert_eq!(stats.imbalance(), 1.0);
    }

    #[test]
    fn test_remove_then_recompute_agree() {
        let mut group = members();
        let mut stats = GroupStats::from_members(&group);

        let removed = group.remove(0);
        stats.apply_remove(&removed);
        assert_eq!(stats, GroupStats::from_members(&group));

        let late = group.remove(0);
        stats.apply_remove(&late);
        assert_eq!(stats, GroupStats::from_members(&group));
        assert_eq!(stats.late, 0);
    }

    #[test]
    fn test_recompute_matches_incremental_per_group() {
        let all = members();
        let groups = vec![all[..2].to_vec(), all[2..].to_vec()];

        let mut incremental = vec![GroupStats::default(), GroupStats::default()];
        for (i, group) in groups.iter().enumerate() {
            for member in group {
                incremental[i].apply_insert(member);
            }
        }

        let rebuilt = recompute(groups.iter().map(|g| g.as_slice()));
        assert_eq!(incremental, rebuilt);
    }

    #[test]
    fn test_projected_imbalance() {
        let stats = GroupStats::from_members(&members()[..1]);
        // One male alone scores 1.0; adding a female balances it
        assert_eq!(stats.imbalance_with(Gender::Female), 1.0);
        assert_eq!(stats.imbalance_with(Gender::Male), 2.0);
        assert_eq!(stats.imbalance_after_swap(Gender::Male, Gender::Female), 1.0);
    }
}
