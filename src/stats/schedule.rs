// Pro-team game schedule: date-indexed game counts plus the projection of a
// per-game stat line onto a date range.
//
// The schedule CSV has one row per date and one column per pro-team id; the
// team-name → id mapping is a flat TOML table. Both are loaded once per
// process and cached by the caller.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::stats::resolve::Resolution;
use crate::stats::StatLine;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("invalid date `{value}` in schedule")]
    Date { value: String },

    #[error("duplicate schedule row for {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("failed to parse team mapping {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Date-indexed game counts per pro team. The `BTreeMap` keeps the dates
/// unique and sorted, which makes half-open range queries direct.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    days: BTreeMap<NaiveDate, HashMap<u32, u32>>,
}

impl Schedule {
    pub fn new() -> Schedule {
        Schedule::default()
    }

    /// Insert a day's game counts. Duplicate dates are a data error.
    pub fn insert_day(
        &mut self,
        date: NaiveDate,
        games: HashMap<u32, u32>,
    ) -> Result<(), ScheduleError> {
        if self.days.contains_key(&date) {
            return Err(ScheduleError::DuplicateDate { date });
        }
        self.days.insert(date, games);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Count games for `team_id` over the half-open range `[start, end)`.
    /// Dates absent from the schedule, and days the team does not appear,
    /// contribute 0. A zero-width or inverted range counts 0 games.
    pub fn games_in_range(&self, team_id: u32, start: NaiveDate, end: NaiveDate) -> u32 {
        if start >= end {
            return 0;
        }
        self.days
            .range(start..end)
            .map(|(_, games)| games.get(&team_id).copied().unwrap_or(0))
            .sum()
    }
}

/// Scale a resolved per-game line to a game count. An excluded or missing
/// resolution projects to the all-zero line no matter how many games the
/// range holds.
pub fn project(resolution: &Resolution, games: u32) -> StatLine {
    match resolution {
        Resolution::Available(line) => line.scaled(games as f64),
        Resolution::Excluded | Resolution::Missing => StatLine::default(),
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_schedule_from_reader<R: Read>(rdr: R) -> Result<Schedule, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    // First header cell is the date column; the rest are pro-team ids.
    let team_ids: Vec<Option<u32>> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.trim().parse::<u32>().ok())
        .collect();

    let mut schedule = Schedule::new();
    for record in reader.records() {
        let record = record?;
        let Some(date_field) = record.get(0) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_field.trim(), "%Y-%m-%d") else {
            warn!("skipping schedule row with unparseable date `{}`", date_field);
            continue;
        };

        let mut games = HashMap::new();
        for (team_id, cell) in team_ids.iter().zip(record.iter().skip(1)) {
            let Some(team_id) = team_id else { continue };
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(count) if count.is_finite() && count > 0.0 => {
                    games.insert(*team_id, count.round() as u32);
                }
                Ok(_) => {}
                Err(_) => {
                    warn!("skipping unparseable schedule cell `{cell}` on {date}");
                }
            }
        }
        if schedule.insert_day(date, games).is_err() {
            warn!("duplicate schedule row for {date}, keeping the first");
        }
    }
    Ok(schedule)
}

/// Load the pro-team schedule from a CSV file.
pub fn load_schedule(path: &Path) -> Result<Schedule, ScheduleError> {
    let file = std::fs::File::open(path).map_err(|e| ScheduleError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_schedule_from_reader(file).map_err(|e| ScheduleError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the pro-team-name → schedule-column-id mapping from a flat TOML
/// table (e.g. `BOS = 2`). Keys are normalized to uppercase.
pub fn load_team_ids(path: &Path) -> Result<HashMap<String, u32>, ScheduleError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScheduleError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: HashMap<String, u32> =
        toml::from_str(&text).map_err(|e| ScheduleError::Toml {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(raw
        .into_iter()
        .map(|(name, id)| (name.to_uppercase(), id))
        .collect())
}
