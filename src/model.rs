use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::PoolError;

pub type ParticipantId = String;

/// Skill tier of a participant. Missing or non-numeric input lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Unknown,
    Level(i32),
}

impl Tier {
    /// Parse a raw roster cell. Accepts "3", " 3 " and "3.0"; anything else is `Unknown`.
    pub fn parse(raw: &str) -> Tier {
        let trimmed = raw.trim();
        if let Ok(level) = trimmed.parse::<i32>() {
            return Tier::Level(level);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() && value.fract() == 0.0 => Tier::Level(value as i32),
            _ => Tier::Unknown,
        }
    }

    pub fn level(&self) -> Option<i32> {
        match self {
            Tier::Level(level) => Some(*level),
            Tier::Unknown => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Level(level) => write!(f, "L{}", level),
            Tier::Unknown => write!(f, "L?"),
        }
    }
}

// Serialized as its display form so tier histograms can be JSON object keys.
impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> Option<Gender> {
        match raw.trim().to_lowercase().as_str() {
            "男性" | "男" | "male" | "m" | "a" => Some(Gender::Male),
            "女性" | "女" | "female" | "f" | "b" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn opposite(self) -> Gender {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

/// One row of the member roster as it comes off the sheet. Every field is optional
/// here; `Pool::from_records` decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    #[serde(alias = "学籍番号", default)]
    pub id: Option<String>,
    #[serde(alias = "名前", default)]
    pub name: Option<String>,
    #[serde(alias = "学年", default)]
    pub grade: Option<String>,
    #[serde(alias = "レベル", alias = "level", default, deserialize_with = "keep_blank")]
    pub tier: Option<String>,
    #[serde(alias = "性別", default)]
    pub gender: Option<String>,
    #[serde(alias = "所属", default)]
    pub department: Option<String>,
}

// A blank tier cell means "unknown tier", which is different from the column being absent.
fn keep_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub grade: String,
    pub tier: Tier,
    pub gender: Gender,
    pub late: bool,
    pub department: Option<String>,
}

impl Participant {
    pub fn new(id: &str, tier: Tier, gender: Gender) -> Self {
        Participant {
            id: id.to_string(),
            name: id.to_string(),
            grade: String::new(),
            tier,
            gender,
            late: false,
            department: None,
        }
    }

    pub fn late(mut self) -> Self {
        self.late = true;
        self
    }
}

/// The validated participant pool for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pool {
    participants: Vec<Participant>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl Pool {
    pub fn new(participants: Vec<Participant>) -> Self {
        Pool { participants }
    }

    /// Build the pool from raw roster records, flagging everyone in `late_ids`.
    /// Rows are numbered from 1 in error messages.
    pub fn from_records(
        records: Vec<RosterRecord>,
        late_ids: &HashSet<ParticipantId>,
    ) -> Result<Pool, PoolError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut participants = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            let id = present(&record.id);
            let gender = present(&record.gender);
            // The tier column must exist, but its content may be blank or junk.
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("id");
            }
            if gender.is_none() {
                missing.push("gender");
            }
            if record.tier.is_none() {
                missing.push("tier");
            }
            let (Some(id), Some(gender), Some(tier)) = (id, gender, record.tier.as_deref()) else {
                return Err(PoolError::MissingFields {
                    row,
                    fields: missing,
                });
            };

            let gender = Gender::parse(gender).ok_or_else(|| PoolError::InvalidGender {
                row,
                value: gender.to_string(),
            })?;
            if !seen.insert(id.to_string()) {
                return Err(PoolError::DuplicateId(id.to_string()));
            }

            participants.push(Participant {
                id: id.to_string(),
                name: present(&record.name).unwrap_or(id).to_string(),
                grade: present(&record.grade).unwrap_or_default().to_string(),
                tier: Tier::parse(tier),
                gender,
                late: late_ids.contains(id),
                department: present(&record.department).map(str::to_string),
            });
        }

        for late_id in late_ids {
            if !seen.contains(late_id.as_str()) {
                warn!(id = %late_id, "late id does not match any participant; ignoring");
            }
        }

        Ok(Pool { participants })
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Male and female head counts across the whole pool.
    pub fn gender_counts(&self) -> (usize, usize) {
        let male = self
            .participants
            .iter()
            .filter(|p| p.gender == Gender::Male)
            .count();
        (male, self.participants.len() - male)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, tier: &str, gender: &str) -> RosterRecord {
        RosterRecord {
            id: Some(id.to_string()),
            name: Some(format!("name-{}", id)),
            grade: Some("2".to_string()),
            tier: Some(tier.to_string()),
            gender: Some(gender.to_string()),
            department: None,
        }
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(Tier::parse("3"), Tier::Level(3));
        assert_eq!(Tier::parse(" 6 "), Tier::Level(6));
        assert_eq!(Tier::parse("4.0"), Tier::Level(4));
        assert_eq!(Tier::parse(""), Tier::Unknown);
        assert_eq!(Tier::parse("beginner"), Tier::Unknown);
        assert_eq!(Tier::parse("2.5"), Tier::Unknown);
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("男性"), Some(Gender::Male));
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("B"), Some(Gender::Female));
        assert_eq!(Gender::parse("other"), None);
    }

    #[test]
    fn test_from_records_flags_late_members() {
        let records = vec![record("S001", "3", "男性"), record("S002", "x", "女性")];
        let late: HashSet<String> = ["S002".to_string()].into_iter().collect();
        let pool = Pool::from_records(records, &late).unwrap();

        assert_eq!(pool.len(), 2);
        assert!(!pool.participants()[0].late);
        assert!(pool.participants()[1].late);
        // Junk tiers are coerced, not rejected
        assert_eq!(pool.participants()[1].tier, Tier::Unknown);
        assert_eq!(pool.gender_counts(), (1, 1));
    }

    #[test]
    fn test_from_records_names_missing_fields() {
        let mut bad = record("S002", "3", "男性");
        bad.id = Some("  ".to_string());
        bad.tier = None;
        let records = vec![record("S001", "3", "男性"), bad];
        let err = Pool::from_records(records, &HashSet::new()).unwrap_err();

        assert_eq!(
            err,
            PoolError::MissingFields {
                row: 2,
                fields: vec!["id", "tier"]
            }
        );
        assert!(err.to_string().contains("id, tier"));
    }

    #[test]
    fn test_from_records_rejects_duplicates_and_bad_gender() {
        let records = vec![record("S001", "3", "m"), record("S001", "2", "f")];
        assert_eq!(
            Pool::from_records(records, &HashSet::new()),
            Err(PoolError::DuplicateId("S001".to_string()))
        );

        let records = vec![record("S001", "3", "unknown")];
        assert!(matches!(
            Pool::from_records(records, &HashSet::new()),
            Err(PoolError::InvalidGender { row: 1, .. })
        ));
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let mut r = record("S009", "1", "f");
        r.name = None;
        let pool = Pool::from_records(vec![r], &HashSet::new()).unwrap();
        assert_eq!(pool.participants()[0].name, "S009");
    }
}
