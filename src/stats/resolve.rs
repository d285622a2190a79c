// Resolution of a player's canonical per-game stat line from multiple,
// possibly-partial provider sources.
//
// The recognized source keys are configuration data (a new season's key is a
// config edit, not a code branch). Each stat is averaged across the sources
// that report it; a source missing a stat simply contributes nothing to that
// stat's average.

use std::collections::HashMap;

use tracing::warn;

use crate::espn::{InjuryStatus, LineupSlot, Player};
use crate::stats::StatLine;

/// Counting-stat keys read from provider sources. Ratio keys a source may
/// report directly are ignored; ratios are always derived from components.
const COUNTING_KEYS: [&str; 11] = [
    "PTS", "REB", "AST", "STL", "BLK", "3PM", "TO", "FGM", "FGA", "FTM", "FTA",
];

/// Which injury designations count toward stat contribution. IR players are
/// excluded regardless of these flags. Both default to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InclusionFlags {
    pub include_day_to_day: bool,
    pub include_out: bool,
}

/// Outcome of resolving one player.
///
/// `Excluded` and `Missing` both contribute zero to any aggregation, but are
/// kept distinct: an excluded player was filtered by availability, while a
/// missing player had no recognized source data (a data-quality signal that
/// is logged when it happens).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Excluded,
    Missing,
    Available(StatLine),
}

impl Resolution {
    /// The line to feed into aggregation: zero unless available.
    pub fn line(&self) -> StatLine {
        match self {
            Resolution::Available(line) => *line,
            Resolution::Excluded | Resolution::Missing => StatLine::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Resolution::Available(_))
    }
}

/// Availability filter. IR always excludes; OUT excludes unless
/// `include_out`; DTD/QUESTIONABLE exclude unless `include_day_to_day`.
pub fn is_excluded(player: &Player, flags: InclusionFlags) -> bool {
    if player.lineup_slot == LineupSlot::InjuredReserve {
        return true;
    }
    match player.injury_status {
        InjuryStatus::Out => !flags.include_out,
        InjuryStatus::DayToDay | InjuryStatus::Questionable => !flags.include_day_to_day,
        InjuryStatus::Active => false,
    }
}

/// Resolve a player's average per-game stat line.
///
/// `source_keys` is the ordered list of recognized source identifiers (the
/// result is order-independent, since each stat is a plain arithmetic mean
/// over the sources that report it).
pub fn resolve(player: &Player, source_keys: &[String], flags: InclusionFlags) -> Resolution {
    if is_excluded(player, flags) {
        return Resolution::Excluded;
    }

    // Per-stat running (sum, count) over the recognized sources.
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for key in source_keys {
        let Some(source) = player.stats.get(key) else {
            continue;
        };
        for stat in COUNTING_KEYS {
            if let Some(value) = source.get(stat) {
                if value.is_finite() {
                    let entry = sums.entry(stat).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
            }
        }
    }

    if sums.is_empty() {
        warn!(player = %player.name, "no recognized stat source for player");
        return Resolution::Missing;
    }

    let averaged: HashMap<String, f64> = sums
        .into_iter()
        .map(|(stat, (sum, count))| (stat.to_string(), sum / count as f64))
        .collect();

    Resolution::Available(StatLine::from_averages(&averaged))
}
