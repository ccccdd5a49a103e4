//! CSV input for the member roster and the daily status log.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::attendance::AttendanceRecord;
use crate::error::RosterError;
use crate::model::RosterRecord;

fn read_records<T, R>(reader: R, what: &str) -> Result<Vec<T>, RosterError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| RosterError::Csv {
            what: what.to_string(),
            source,
        })
}

fn open(path: &Path) -> Result<File, RosterError> {
    File::open(path).map_err(|source| RosterError::Io {
        what: path.display().to_string(),
        source,
    })
}

pub fn read_roster<R: Read>(reader: R, what: &str) -> Result<Vec<RosterRecord>, RosterError> {
    read_records(reader, what)
}

pub fn load_roster(path: &Path) -> Result<Vec<RosterRecord>, RosterError> {
    read_roster(open(path)?, &path.display().to_string())
}

pub fn read_attendance<R: Read>(
    reader: R,
    what: &str,
) -> Result<Vec<AttendanceRecord>, RosterError> {
    read_records(reader, what)
}

pub fn load_attendance(path: &Path) -> Result<Vec<AttendanceRecord>, RosterError> {
    read_attendance(open(path)?, &path.display().to_string())
}
