use std::fmt;
use std::str::FromStr;

/// Tuning knobs for one partition run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignConfig {
    /// Seed for every random tie-break. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Upper bound on rebalancing iterations.
    pub max_iterations: usize,
    /// Groups whose imbalance is at or above this are gender-swap sources.
    pub gender_threshold: f64,
    /// A swap partner may worsen to at most this multiple of its previous imbalance.
    pub partner_worsening_limit: f64,
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_iterations: 8,
            gender_threshold: 1.5,
            partner_worsening_limit: 1.5,
        }
    }
}

impl AssignConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// The club's practice formats and how many courts each one uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PracticeType {
    #[default]
    Knock,
    HandKnock,
}

impl PracticeType {
    pub fn group_count(&self) -> usize {
        match self {
            PracticeType::Knock => 8,
            PracticeType::HandKnock => 12,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PracticeType::Knock => "knock",
            PracticeType::HandKnock => "hand-knock",
        }
    }
}

impl fmt::Display for PracticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PracticeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "knock" | "ノック" => Ok(PracticeType::Knock),
            "hand-knock" | "handknock" | "ハンドノック" => Ok(PracticeType::HandKnock),
            other => Err(format!("unknown practice type '{other}' (expected knock or hand-knock)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_practice_group_counts() {
        assert_eq!(PracticeType::Knock.group_count(), 8);
        assert_eq!(PracticeType::HandKnock.group_count(), 12);
        assert_eq!("ハンドノック".parse::<PracticeType>(), Ok(PracticeType::HandKnock));
        assert_eq!(" Knock ".parse::<PracticeType>(), Ok(PracticeType::Knock));
        assert!("drill".parse::<PracticeType>().is_err());
    }

    #[test]
    fn test_seeded_keeps_defaults() {
        let config = AssignConfig::seeded(7);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_iterations, AssignConfig::default().max_iterations);
    }
}
