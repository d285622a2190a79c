// Projection-pool loading and normalization.
//
// Reads hashtagbasketball-format projection CSVs: one row per player with
// rank, ADP, per-game stat columns, and percentage cells that may carry a
// made/attempted breakdown in parentheses ("0.475 (5.3/11.2)"). Rows are
// validated at ingestion; arithmetic never runs on absent fields.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::stats::{StatCol, StatLine};

pub mod standardize;

/// The stat columns tracked by the draft-pool standardizer.
pub const TRACKED_STATS: [StatCol; 9] = [
    StatCol::FgPct,
    StatCol::FtPct,
    StatCol::ThreePm,
    StatCol::Pts,
    StatCol::Reb,
    StatCol::Ast,
    StatCol::Stl,
    StatCol::Blk,
    StatCol::To,
];

/// One eligible player in the projection pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPlayer {
    pub name: String,
    pub rank: u32,
    pub adp: f64,
    pub positions: Vec<String>,
    pub team: String,
    pub games_played: f64,
    pub minutes_per_game: f64,
    pub line: StatLine,
    /// 0 = undrafted; nonzero = owning team identifier.
    pub drafted_by: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// The static projection table plus its mutable `drafted_by` partition.
///
/// Rows are immutable after load; draft edits replace the `drafted_by`
/// column wholesale via [`ProjectionPool::with_drafted_column`], producing a
/// new snapshot so before/after states stay consistent for re-fitting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionPool {
    players: Vec<PoolPlayer>,
}

impl ProjectionPool {
    /// Build a pool, enforcing the name-uniqueness invariant (player name is
    /// the join key everywhere downstream).
    pub fn new(players: Vec<PoolPlayer>) -> Result<ProjectionPool, ProjectionError> {
        let mut seen = HashSet::new();
        for player in &players {
            if !seen.insert(player.name.as_str()) {
                return Err(ProjectionError::Validation(format!(
                    "duplicate player name `{}` in projection pool",
                    player.name
                )));
            }
        }
        Ok(ProjectionPool { players })
    }

    pub fn players(&self) -> &[PoolPlayer] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn undrafted(&self) -> impl Iterator<Item = &PoolPlayer> {
        self.players.iter().filter(|p| p.drafted_by == 0)
    }

    pub fn drafted_column(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.drafted_by).collect()
    }

    /// Snapshot with a replacement `drafted_by` column. The column length
    /// must match the pool; callers validate edit indices beforehand.
    pub fn with_drafted_column(&self, column: Vec<u32>) -> ProjectionPool {
        debug_assert_eq!(column.len(), self.players.len());
        let players = self
            .players
            .iter()
            .zip(column)
            .map(|(player, drafted_by)| PoolPlayer {
                drafted_by,
                ..player.clone()
            })
            .collect();
        ProjectionPool { players }
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private) — hashtagbasketball format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawProjection {
    #[serde(rename = "PLAYER")]
    player: String,
    #[serde(rename = "R#")]
    rank: f64,
    #[serde(rename = "ADP", default)]
    adp: f64,
    #[serde(rename = "POS", default)]
    pos: String,
    #[serde(rename = "TEAM", default)]
    team: String,
    #[serde(rename = "GP")]
    gp: f64,
    #[serde(rename = "MPG", default)]
    mpg: f64,
    #[serde(rename = "FG%")]
    fg_pct: String,
    #[serde(rename = "FT%")]
    ft_pct: String,
    #[serde(rename = "3PM", alias = "3pm")]
    tpm: f64,
    #[serde(rename = "PTS")]
    pts: f64,
    #[serde(rename = "TREB", alias = "REB")]
    reb: f64,
    #[serde(rename = "AST")]
    ast: f64,
    #[serde(rename = "STL")]
    stl: f64,
    #[serde(rename = "BLK")]
    blk: f64,
    #[serde(rename = "TO")]
    to: f64,
    /// Absorb any extra columns (TOTAL, punts, ...).
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

/// Parse a percentage cell. Some projections label percentages as
/// `X (Y/Z)`; the parenthetical is the per-game made/attempted breakdown.
fn parse_percentage(raw: &str) -> Option<(f64, Option<(f64, f64)>)> {
    let raw = raw.trim();
    if let Some(open) = raw.find('(') {
        let value: f64 = raw[..open].trim().parse().ok()?;
        let inner = raw[open + 1..].strip_suffix(')')?;
        let (made, attempted) = inner.split_once('/')?;
        let made: f64 = made.trim().parse().ok()?;
        let attempted: f64 = attempted.trim().parse().ok()?;
        Some((value, Some((made, attempted))))
    } else {
        raw.parse().ok().map(|v| (v, None))
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn load_from_reader<R: Read>(rdr: R) -> Result<Vec<PoolPlayer>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawProjection>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
                continue;
            }
        };
        let name = raw.player.trim().to_string();

        let Some((fg_pct, fg_parts)) = parse_percentage(&raw.fg_pct) else {
            warn!("skipping player '{}': unparseable FG% cell", name);
            continue;
        };
        let Some((ft_pct, ft_parts)) = parse_percentage(&raw.ft_pct) else {
            warn!("skipping player '{}': unparseable FT% cell", name);
            continue;
        };
        if !all_finite(&[
            raw.gp, raw.mpg, raw.pts, raw.reb, raw.ast, raw.stl, raw.blk, raw.to, raw.tpm,
            fg_pct, ft_pct,
        ]) {
            warn!("skipping player '{}': non-finite stat value", name);
            continue;
        }

        let (fgm, fga) = fg_parts.unwrap_or((0.0, 0.0));
        let (ftm, fta) = ft_parts.unwrap_or((0.0, 0.0));
        players.push(PoolPlayer {
            name,
            rank: raw.rank.round().max(0.0) as u32,
            adp: raw.adp,
            positions: raw
                .pos
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            team: raw.team.trim().to_string(),
            games_played: raw.gp,
            minutes_per_game: raw.mpg,
            line: StatLine {
                pts: raw.pts,
                reb: raw.reb,
                ast: raw.ast,
                stl: raw.stl,
                blk: raw.blk,
                tpm: raw.tpm,
                to: raw.to,
                fgm,
                fga,
                ftm,
                fta,
                fg_pct,
                ft_pct,
            },
            drafted_by: 0,
        });
    }
    Ok(players)
}

/// Load the projection pool from a CSV file. Sorted by ADP so the draft
/// board reads in pick order.
pub fn load_pool(path: &Path) -> Result<ProjectionPool, ProjectionError> {
    let file = std::fs::File::open(path).map_err(|e| ProjectionError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut players = load_from_reader(file).map_err(|e| ProjectionError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if players.is_empty() {
        return Err(ProjectionError::Validation(
            "projection CSV produced zero valid rows".into(),
        ));
    }
    players.sort_by(|a, b| a.adp.partial_cmp(&b.adp).unwrap_or(std::cmp::Ordering::Equal));
    ProjectionPool::new(players)
}
