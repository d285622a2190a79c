// Stat-line record and column schema for category leagues.
//
// Every stat table in the system is built from `StatLine` values. The two
// ratio stats (FG%, FT%) are always recomputed from their made/attempted
// components after any aggregation or scaling; they are never averaged or
// summed directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod resolve;
pub mod schedule;
pub mod summary;
pub mod table;

/// Per-game (or per-range) stat values for one player, roster, or team.
///
/// `fg_pct` and `ft_pct` are derived fields. Code that produces a `StatLine`
/// from arithmetic on other lines must call [`StatLine::recompute_ratios`]
/// (or go through a constructor that does) before handing the line out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatLine {
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tpm: f64,
    pub to: f64,
    pub fgm: f64,
    pub fga: f64,
    pub ftm: f64,
    pub fta: f64,
    pub fg_pct: f64,
    pub ft_pct: f64,
}

/// Divide made by attempted, defining the zero-attempted case as 0.0.
///
/// This is the single defensive rule of the arithmetic surface: a ratio stat
/// never produces NaN or an error, it degrades to zero.
pub fn ratio(made: f64, attempted: f64) -> f64 {
    if attempted == 0.0 {
        0.0
    } else {
        made / attempted
    }
}

impl StatLine {
    /// Recompute FG% and FT% from the counting components.
    pub fn recompute_ratios(&mut self) {
        self.fg_pct = ratio(self.fgm, self.fga);
        self.ft_pct = ratio(self.ftm, self.fta);
    }

    /// Build a line from a stat-name → value map, defaulting absent counting
    /// stats to 0.0 and recomputing the ratios. Unrecognized keys are
    /// ignored; ratio keys present in the map are ignored too, since the
    /// ratios are derived from the components.
    pub fn from_averages(map: &HashMap<String, f64>) -> StatLine {
        let get = |key: &str| map.get(key).copied().unwrap_or(0.0);
        let mut line = StatLine {
            pts: get("PTS"),
            reb: get("REB"),
            ast: get("AST"),
            stl: get("STL"),
            blk: get("BLK"),
            tpm: get("3PM"),
            to: get("TO"),
            fgm: get("FGM"),
            fga: get("FGA"),
            ftm: get("FTM"),
            fta: get("FTA"),
            fg_pct: 0.0,
            ft_pct: 0.0,
        };
        line.recompute_ratios();
        line
    }

    /// Scale every counting stat by a game count and recompute the ratios.
    /// Scaling by 0 games yields an all-zero line.
    pub fn scaled(&self, games: f64) -> StatLine {
        let mut line = StatLine {
            pts: self.pts * games,
            reb: self.reb * games,
            ast: self.ast * games,
            stl: self.stl * games,
            blk: self.blk * games,
            tpm: self.tpm * games,
            to: self.to * games,
            fgm: self.fgm * games,
            fga: self.fga * games,
            ftm: self.ftm * games,
            fta: self.fta * games,
            fg_pct: 0.0,
            ft_pct: 0.0,
        };
        line.recompute_ratios();
        line
    }

    /// Add another line's counting stats into this one. Ratios are left
    /// stale; the caller recomputes them once after the last addition.
    pub fn add_counting(&mut self, other: &StatLine) {
        self.pts += other.pts;
        self.reb += other.reb;
        self.ast += other.ast;
        self.stl += other.stl;
        self.blk += other.blk;
        self.tpm += other.tpm;
        self.to += other.to;
        self.fgm += other.fgm;
        self.fga += other.fga;
        self.ftm += other.ftm;
        self.fta += other.fta;
    }
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

/// A displayed stat column. The fixed display order puts the counting stats
/// first and the two ratio stats last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatCol {
    Pts,
    Reb,
    Ast,
    Stl,
    Blk,
    ThreePm,
    To,
    FgPct,
    FtPct,
}

impl StatCol {
    /// The fixed, ordered display schema for comparison tables.
    pub const DISPLAY_ORDER: [StatCol; 9] = [
        StatCol::Pts,
        StatCol::Reb,
        StatCol::Ast,
        StatCol::Stl,
        StatCol::Blk,
        StatCol::ThreePm,
        StatCol::To,
        StatCol::FgPct,
        StatCol::FtPct,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatCol::Pts => "PTS",
            StatCol::Reb => "REB",
            StatCol::Ast => "AST",
            StatCol::Stl => "STL",
            StatCol::Blk => "BLK",
            StatCol::ThreePm => "3PM",
            StatCol::To => "TO",
            StatCol::FgPct => "FG%",
            StatCol::FtPct => "FT%",
        }
    }

    /// Read this column's value out of a line.
    pub fn value(&self, line: &StatLine) -> f64 {
        match self {
            StatCol::Pts => line.pts,
            StatCol::Reb => line.reb,
            StatCol::Ast => line.ast,
            StatCol::Stl => line.stl,
            StatCol::Blk => line.blk,
            StatCol::ThreePm => line.tpm,
            StatCol::To => line.to,
            StatCol::FgPct => line.fg_pct,
            StatCol::FtPct => line.ft_pct,
        }
    }

    /// Rank direction for coloring. Turnovers are the one category where a
    /// lower value ranks better.
    pub fn lower_is_better(&self) -> bool {
        matches!(self, StatCol::To)
    }
}
