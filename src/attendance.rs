//! Resolve the daily status log into absent and late members for one practice date.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::ParticipantId;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// One row of the status log, as submitted through the club's form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(alias = "タイムスタンプ", default)]
    pub timestamp: Option<String>,
    #[serde(alias = "学籍番号", default)]
    pub id: Option<String>,
    #[serde(alias = "日付を選択してください", alias = "date", default)]
    pub target_date: Option<String>,
    #[serde(alias = "状況", default)]
    pub status: Option<String>,
    #[serde(alias = "遅刻・欠席理由", default)]
    pub reason: Option<String>,
    #[serde(alias = "遅刻の場合", default)]
    pub late_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Absent,
    Late,
    Other,
}

impl Status {
    pub fn parse(raw: &str) -> Status {
        match raw.trim().to_lowercase().as_str() {
            "欠席" | "absent" => Status::Absent,
            "遅刻" | "late" => Status::Late,
            _ => Status::Other,
        }
    }
}

/// Who skips and who arrives late on a given date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyStatus {
    pub absent: HashSet<ParticipantId>,
    pub late: HashSet<ParticipantId>,
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Accepts a bare date or a full timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date()))
}

/// Each member's latest report for `date` decides their status. Reports filed after
/// that day are ignored.
pub fn resolve(records: &[AttendanceRecord], date: NaiveDate) -> DailyStatus {
    let mut latest: HashMap<&str, (NaiveDateTime, Status)> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let id = record.id.as_deref().map(str::trim).unwrap_or_default();
        let timestamp = record.timestamp.as_deref().and_then(parse_timestamp);
        let target = record.target_date.as_deref().and_then(parse_date);
        let (Some(timestamp), Some(target)) = (timestamp, target) else {
            debug!(row = index + 1, "skipping status row with unreadable dates");
            continue;
        };
        if id.is_empty() {
            debug!(row = index + 1, "skipping status row without an id");
            continue;
        }
        if target != date || timestamp.date() > date {
            continue;
        }

        let status = Status::parse(record.status.as_deref().unwrap_or_default());
        // Equal timestamps: the row further down the log wins
        let newer = latest
            .get(id)
            .map_or(true, |(seen, _)| timestamp >= *seen);
        if newer {
            latest.insert(id, (timestamp, status));
        }
    }

    let mut daily = DailyStatus::default();
    for (id, (_, status)) in latest {
        match status {
            Status::Absent => {
                daily.absent.insert(id.to_string());
            }
            Status::Late => {
                daily.late.insert(id.to_string());
            }
            Status::Other => {}
        }
    }
    debug!(
        %date,
        absent = daily.absent.len(),
        late = daily.late.len(),
        "resolved daily status"
    );
    daily
}
