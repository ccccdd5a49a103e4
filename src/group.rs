use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::Participant;
use crate::stats::GroupStats;

/// "Group N" label. Orders by number, so "Group 2" sorts before "Group 10".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupLabel(pub usize);

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group {}", self.0)
    }
}

impl Serialize for GroupLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub label: GroupLabel,
    pub members: Vec<Participant>,
    pub stats: GroupStats,
}

impl Group {
    pub fn new(number: usize) -> Self {
        Group {
            label: GroupLabel(number),
            members: Vec::new(),
            stats: GroupStats::default(),
        }
    }

    pub fn add_member(&mut self, participant: Participant) {
        self.stats.apply_insert(&participant);
        self.members.push(participant);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Exchange `groups[a].members[i]` with `groups[b].members[j]` and keep both stats in step.
/// Callers only pair members of the same tier, so sizes and tier histograms are untouched.
pub fn swap_members(groups: &mut [Group], (a, i): (usize, usize), (b, j): (usize, usize)) {
    debug_assert_eq!(groups[a].members[i].tier, groups[b].members[j].tier);
    // Within one group a swap only reorders members; stats stay as they are
    if a == b {
        groups[a].members.swap(i, j);
        return;
    }

    let (first, second) = if a < b {
        let (left, right) = groups.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = groups.split_at_mut(a);
        (&mut right[0], &mut left[b])
    };

    let x = &mut first.members[i];
    let y = &mut second.members[j];
    first.stats.apply_remove(x);
    second.stats.apply_remove(y);
    std::mem::swap(x, y);
    first.stats.apply_insert(x);
    second.stats.apply_insert(y);
}
