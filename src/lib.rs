//! Balanced court assignment for club practice.
//!
//! A pool of members, each with a skill tier, a gender and an optional late flag, is split
//! into equally sized groups by a tier-priority greedy pass ([assign]) and then refined by
//! same-tier swaps ([rebalance]). [partition] runs both.

pub mod assign;
pub mod attendance;
pub mod config;
pub mod error;
pub mod group;
pub mod logging;
pub mod model;
pub mod partition;
pub mod rebalance;
pub mod report;
pub mod roster;
pub mod scorer;
pub mod stats;

pub use config::{AssignConfig, PracticeType};
pub use error::{PoolError, RosterError};
pub use group::{Group, GroupLabel};
pub use model::{Gender, Participant, ParticipantId, Pool, RosterRecord, Tier};
pub use partition::{partition, partition_with_stop, Assignment};
pub use rebalance::{Phase, RebalanceReport, SwapRecord};
pub use stats::GroupStats;
