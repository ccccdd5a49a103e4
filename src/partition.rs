use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::assign::assign;
use crate::config::AssignConfig;
use crate::group::{Group, GroupLabel};
use crate::model::{Participant, Pool};
use crate::rebalance::{rebalance, RebalanceReport};
use crate::stats::GroupStats;

/// Final grouping handed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assignment {
    pub groups: Vec<Group>,
    pub report: RebalanceReport,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Label to members, ordered "Group 1", "Group 2", ...
    pub fn to_map(&self) -> BTreeMap<GroupLabel, Vec<Participant>> {
        self.groups
            .iter()
            .map(|g| (g.label, g.members.clone()))
            .collect()
    }

    pub fn stats(&self) -> BTreeMap<GroupLabel, GroupStats> {
        self.groups
            .iter()
            .map(|g| (g.label, g.stats.clone()))
            .collect()
    }

    pub fn total_members(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

/// Split `pool` into `min(target_group_count, pool size)` balanced groups.
pub fn partition(pool: &Pool, target_group_count: usize, config: &AssignConfig) -> Assignment {
    partition_with_stop(pool, target_group_count, config, None)
}

/// Like [partition], but stops rebalancing at the next iteration boundary once
/// `running` is cleared.
pub fn partition_with_stop(
    pool: &Pool,
    target_group_count: usize,
    config: &AssignConfig,
    running: Option<&AtomicBool>,
) -> Assignment {
    let group_count = target_group_count.min(pool.len());
    if group_count == 0 {
        info!(
            participants = pool.len(),
            requested = target_group_count,
            "nothing to assign"
        );
        return Assignment::default();
    }
    if group_count != target_group_count {
        info!(
            requested = target_group_count,
            actual = group_count,
            "group count clamped to pool size"
        );
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut groups = assign(pool, group_count, &mut rng);
    let report = rebalance(&mut groups, config, &mut rng, running);
    info!(
        groups = groups.len(),
        iterations = report.iterations,
        late_swaps = report.late_swaps,
        gender_swaps = report.gender_swaps,
        converged = report.converged,
        "partition finished"
    );

    Assignment { groups, report }
}
