//! Swap-based refinement of a greedy grouping.
//!
//! Every swap trades one member of a group for a member of the same tier in another
//! group, so group sizes and tier histograms never change. Phase L moves latecomers out
//! of crowded groups; Phase G evens out gender splits. Late members only ever move in
//! Phase L, where they trade places with a regular member of the same tier and gender.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AssignConfig;
use crate::group::{swap_members, Group, GroupLabel};
use crate::model::Gender;
use crate::stats;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Lateness,
    Gender,
}

/// One applied swap. `before`/`after` hold the late spread for Phase L and the
/// pair imbalance sum for Phase G.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRecord {
    pub phase: Phase,
    pub source: GroupLabel,
    pub partner: GroupLabel,
    pub moved_out: String,
    pub moved_in: String,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub iterations: usize,
    pub late_swaps: usize,
    pub gender_swaps: usize,
    /// An iteration finished without a single swap.
    pub converged: bool,
    /// The running flag was cleared before the iteration budget ran out.
    pub interrupted: bool,
    pub swaps: Vec<SwapRecord>,
}

/// Refine `groups` in place for at most `config.max_iterations` iterations.
/// `running` is checked at every iteration boundary; clearing it stops the search
/// with the current grouping intact.
pub fn rebalance<R: Rng + ?Sized>(
    groups: &mut [Group],
    config: &AssignConfig,
    rng: &mut R,
    running: Option<&AtomicBool>,
) -> RebalanceReport {
    let mut report = RebalanceReport::default();
    if groups.len() < 2 {
        report.converged = true;
        return report;
    }

    let swap_budget = groups.iter().map(Group::len).sum::<usize>().max(1);

    for iteration in 1..=config.max_iterations {
        if let Some(flag) = running {
            if !flag.load(Ordering::SeqCst) {
                warn!(iteration, "rebalancing interrupted; keeping current grouping");
                report.interrupted = true;
                break;
            }
        }
        report.iterations = iteration;

        let late = lateness_phase(groups, swap_budget, &mut report);
        let gender = gender_phase(groups, config, rng, swap_budget, &mut report);
        verify_stats(groups);

        info!(iteration, late, gender, "rebalance iteration finished");
        if late == 0 && gender == 0 {
            report.converged = true;
            break;
        }
    }

    report
}

/// Late spread (max - min) and how many groups sit on either extreme.
fn late_measure(counts: &[usize]) -> (usize, usize) {
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    let extremes = counts.iter().filter(|&&c| c == max || c == min).count();
    (max - min, extremes)
}

pub fn late_spread(groups: &[Group]) -> usize {
    let counts: Vec<usize> = groups.iter().map(|g| g.stats.late).collect();
    late_measure(&counts).0
}

fn lateness_phase(groups: &mut [Group], budget: usize, report: &mut RebalanceReport) -> usize {
    let mut swaps = 0;
    while swaps < budget && late_spread(groups) > 1 {
        let Some(((src, i), (dst, j))) = find_late_swap(groups) else {
            debug!("no lateness swap available");
            break;
        };

        let before = late_spread(groups);
        let moved_out = groups[src].members[i].id.clone();
        let moved_in = groups[dst].members[j].id.clone();
        swap_members(groups, (src, i), (dst, j));
        let after = late_spread(groups);

        debug!(%moved_out, %moved_in, before, after, "lateness swap");
        report.swaps.push(SwapRecord {
            phase: Phase::Lateness,
            source: groups[src].label,
            partner: groups[dst].label,
            moved_out,
            moved_in,
            before: before as f64,
            after: after as f64,
        });
        report.late_swaps += 1;
        swaps += 1;
    }
    swaps
}

/// First (late member, regular member) pair whose exchange lowers the late measure.
/// Partners share tier and gender, so no other balance changes.
fn find_late_swap(groups: &[Group]) -> Option<((usize, usize), (usize, usize))> {
    let counts: Vec<usize> = groups.iter().map(|g| g.stats.late).collect();
    let before = late_measure(&counts);

    let mut sources: Vec<usize> = (0..groups.len()).collect();
    sources.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    let mut targets = sources.clone();
    targets.reverse();

    for &src in &sources {
        for &dst in &targets {
            if counts[src] < counts[dst] + 2 {
                continue;
            }
            let mut projected = counts.clone();
            projected[src] -= 1;
            projected[dst] += 1;
            if late_measure(&projected) >= before {
                continue;
            }

            for (i, member) in groups[src].members.iter().enumerate() {
                if !member.late {
                    continue;
                }
                let partner = groups[dst].members.iter().position(|other| {
                    !other.late && other.tier == member.tier && other.gender == member.gender
                });
                if let Some(j) = partner {
                    return Some(((src, i), (dst, j)));
                }
            }
        }
    }
    None
}

/// Whether a gender swap is worth taking given the imbalance of both groups before and after.
pub fn accept_gender_swap(
    old_source: f64,
    new_source: f64,
    old_partner: f64,
    new_partner: f64,
    worsening_limit: f64,
) -> bool {
    let before = old_source + old_partner;
    let after = new_source + new_partner;
    if after > before + EPSILON {
        return false;
    }
    let pair_improves = after < before - EPSILON;
    // An equal-sum trade must lower the worse of the two scores, otherwise the
    // partner can trade the same members straight back.
    let narrows = new_source.max(new_partner) < old_source.max(old_partner) - EPSILON;
    let source_improves = new_source < old_source - EPSILON
        && new_partner < old_partner * worsening_limit
        && narrows;
    pair_improves || source_improves
}

fn gender_phase<R: Rng + ?Sized>(
    groups: &mut [Group],
    config: &AssignConfig,
    rng: &mut R,
    budget: usize,
    report: &mut RebalanceReport,
) -> usize {
    let mut swaps = 0;
    'restart: while swaps < budget {
        let sources: Vec<usize> = (0..groups.len())
            .filter(|&g| groups[g].stats.imbalance() >= config.gender_threshold)
            .collect();

        for src in sources {
            let Some(((src, i), (dst, j))) = find_gender_swap(groups, src, config, rng) else {
                debug!(group = %groups[src].label, "no gender swap available");
                continue;
            };

            let before = groups[src].stats.imbalance() + groups[dst].stats.imbalance();
            let moved_out = groups[src].members[i].id.clone();
            let moved_in = groups[dst].members[j].id.clone();
            swap_members(groups, (src, i), (dst, j));
            let after = groups[src].stats.imbalance() + groups[dst].stats.imbalance();

            debug!(%moved_out, %moved_in, before, after, "gender swap");
            report.swaps.push(SwapRecord {
                phase: Phase::Gender,
                source: groups[src].label,
                partner: groups[dst].label,
                moved_out,
                moved_in,
                before,
                after,
            });
            report.gender_swaps += 1;
            swaps += 1;
            continue 'restart;
        }
        break;
    }
    swaps
}

fn find_gender_swap<R: Rng + ?Sized>(
    groups: &[Group],
    src: usize,
    config: &AssignConfig,
    rng: &mut R,
) -> Option<((usize, usize), (usize, usize))> {
    let stats = &groups[src].stats;
    let majority = if stats.male >= stats.female {
        Gender::Male
    } else {
        Gender::Female
    };
    let minority = majority.opposite();

    let mut picks: Vec<usize> = groups[src]
        .members
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.late && m.gender == majority)
        .map(|(i, _)| i)
        .collect();
    picks.shuffle(rng);
    let mut partners: Vec<usize> = (0..groups.len()).filter(|&g| g != src).collect();
    partners.shuffle(rng);

    let old_source = stats.imbalance();
    let new_source = stats.imbalance_after_swap(majority, minority);

    for i in picks {
        let tier = groups[src].members[i].tier;
        for &dst in &partners {
            let partner = &groups[dst];
            let Some(j) = partner
                .members
                .iter()
                .position(|m| !m.late && m.gender == minority && m.tier == tier)
            else {
                continue;
            };
            let old_partner = partner.stats.imbalance();
            let new_partner = partner.stats.imbalance_after_swap(minority, majority);
            if accept_gender_swap(
                old_source,
                new_source,
                old_partner,
                new_partner,
                config.partner_worsening_limit,
            ) {
                return Some(((src, i), (dst, j)));
            }
        }
    }
    None
}

/// Rebuild stats from membership and replace any that drifted.
fn verify_stats(groups: &mut [Group]) {
    let rebuilt = stats::recompute(groups.iter().map(|g| g.members.as_slice()));
    for (group, fresh) in groups.iter_mut().zip(rebuilt) {
        if group.stats != fresh {
            warn!(group = %group.label, "group stats drifted from membership; recomputed");
            group.stats = fresh;
        }
    }
}
