// Roster- and league-level stat rollups.
//
// The aggregation invariant lives here: team FG%/FT% come from summed
// makes/attempts, never from averaging per-player percentages. Averaging
// already-computed percentages overweights low-volume shooters and silently
// misrepresents shooting efficiency.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use thiserror::Error;

use crate::espn::{League, Player};
use crate::stats::resolve::{resolve, InclusionFlags};
use crate::stats::schedule::{project, Schedule};
use crate::stats::table::ComparisonTable;
use crate::stats::StatLine;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("unknown fantasy team `{name}`")]
    UnknownTeam { name: String },

    #[error("unknown player `{name}` in draft roster")]
    UnknownPlayer { name: String },

    #[error("pro team `{code}` missing from the team-id mapping")]
    UnknownProTeam { code: String },
}

/// Sum a collection of stat lines into one, recomputing the ratio stats
/// from the summed components. Empty input yields the all-zero line.
pub fn aggregate<I>(lines: I) -> StatLine
where
    I: IntoIterator<Item = StatLine>,
{
    let mut total = StatLine::default();
    for line in lines {
        total.add_counting(&line);
    }
    total.recompute_ratios();
    total
}

/// Whole-league snapshot: one row per team, each the aggregate of the
/// roster's resolved per-game averages (non-scaled).
pub fn summarize_league(
    league: &League,
    source_keys: &[String],
    flags: InclusionFlags,
) -> ComparisonTable {
    let mut table = ComparisonTable::default();
    for team in &league.teams {
        let line = aggregate(
            team.roster
                .iter()
                .map(|player| resolve(player, source_keys, flags).line()),
        );
        table.push(team.name.clone(), line);
    }
    table
}

/// Project one roster over a date range and aggregate it.
fn project_roster(
    roster: &[Player],
    schedule: &Schedule,
    team_ids: &HashMap<String, u32>,
    start: NaiveDate,
    end: NaiveDate,
    source_keys: &[String],
    flags: InclusionFlags,
) -> Result<StatLine, SummaryError> {
    let mut lines = Vec::with_capacity(roster.len());
    for player in roster {
        let code = player.pro_team.to_uppercase();
        let pro_id = team_ids
            .get(&code)
            .copied()
            .ok_or(SummaryError::UnknownProTeam { code })?;
        let games = schedule.games_in_range(pro_id, start, end);
        let resolution = resolve(player, source_keys, flags);
        lines.push(project(&resolution, games));
    }
    Ok(aggregate(lines))
}

/// Ranged comparison across selected teams: resolve + project + aggregate
/// each roster over `[start, end)`.
///
/// An empty team selection, a zero-width range, or an inverted range yields
/// an empty table rather than an error; the caller pre-validates ranges it
/// wants to reject loudly. Lookup failures still error.
pub fn compare_teams(
    league: &League,
    team_names: &[String],
    schedule: &Schedule,
    team_ids: &HashMap<String, u32>,
    start: NaiveDate,
    end: NaiveDate,
    source_keys: &[String],
    flags: InclusionFlags,
) -> Result<ComparisonTable, SummaryError> {
    if team_names.is_empty() || start >= end {
        return Ok(ComparisonTable::default());
    }

    let mut table = ComparisonTable::default();
    for name in team_names {
        let team = league.team(name).ok_or_else(|| SummaryError::UnknownTeam {
            name: name.clone(),
        })?;
        let line = project_roster(
            &team.roster,
            schedule,
            team_ids,
            start,
            end,
            source_keys,
            flags,
        )?;
        table.push(team.name.clone(), line);
    }
    Ok(table)
}

/// Hypothetical draft rosters: arbitrary name lists summarized against the
/// player pool. A team with an empty list gets an explicit all-zero row.
pub fn summarize_draft(
    player_pool: &[Player],
    rosters: &BTreeMap<String, Vec<String>>,
    source_keys: &[String],
    flags: InclusionFlags,
) -> Result<ComparisonTable, SummaryError> {
    let by_name: HashMap<&str, &Player> = player_pool
        .iter()
        .map(|player| (player.name.as_str(), player))
        .collect();

    let mut table = ComparisonTable::default();
    for (team_name, player_names) in rosters {
        let mut lines = Vec::with_capacity(player_names.len());
        for name in player_names {
            let player = by_name
                .get(name.as_str())
                .ok_or_else(|| SummaryError::UnknownPlayer { name: name.clone() })?;
            lines.push(resolve(player, source_keys, flags).line());
        }
        table.push(team_name.clone(), aggregate(lines));
    }
    Ok(table)
}
