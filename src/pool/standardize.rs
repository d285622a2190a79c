// Draft-pool standardization session.
//
// Z-scores every player against the shrinking undrafted partition: fit
// parameters come from `drafted_by == 0` rows only, but are applied to the
// whole pool so drafted players stay comparable on the same scale. Each
// draft edit replaces the pool snapshot and the standardized view together,
// as one unit; a reader never sees a new partition under an old fit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::pool::{PoolPlayer, ProjectionPool, TRACKED_STATS};
use crate::stats::StatCol;

/// Threshold below which a population standard deviation is treated as zero.
const SCALE_EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum StandardizeError {
    #[error("standardizers are unfitted; refit must run before apply")]
    NotFitted,

    #[error("draft edit references row {index}, but the pool has {len} rows")]
    RowOutOfBounds { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Per-column standardizer
// ---------------------------------------------------------------------------

/// Fitted mean/scale for one stat column.
///
/// Uses the population standard deviation (N denominator): the undrafted
/// pool is the full reference population, not a sample. A degenerate
/// population (empty, or ~0 spread) fits scale 1.0 so transforms stay
/// finite offsets from the mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    pub mean: f64,
    pub scale: f64,
}

impl Standardizer {
    pub fn fit(values: &[f64]) -> Standardizer {
        if values.is_empty() {
            return Standardizer {
                mean: 0.0,
                scale: 1.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stdev = variance.sqrt();
        Standardizer {
            mean,
            scale: if stdev < SCALE_EPSILON { 1.0 } else { stdev },
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

// ---------------------------------------------------------------------------
// Standardized view
// ---------------------------------------------------------------------------

/// One pool row in z-score space. `values` aligns positionally with
/// [`TRACKED_STATS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedRow {
    pub name: String,
    pub rank: u32,
    pub adp: f64,
    pub drafted_by: u32,
    pub games_played: f64,
    pub values: Vec<f64>,
}

/// The whole pool transformed by the current fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<StandardizedRow>,
}

/// Per-fantasy-team totals of standardized stats, for the drafted-team
/// comparison. `totals` aligns with [`TRACKED_STATS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTeamRow {
    pub drafted_by: u32,
    pub games_played: f64,
    pub totals: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns the projection pool and its standardized view for one drafting
/// session. Explicitly passed around by the caller; there is no ambient
/// shared state.
#[derive(Debug, Clone)]
pub struct DraftSession {
    pool: ProjectionPool,
    /// `None` until the first refit (the Unfitted state). Aligned with
    /// [`TRACKED_STATS`] when present.
    standardizers: Option<Vec<Standardizer>>,
    standardized: Option<StandardizedTable>,
}

fn fit_all(pool: &ProjectionPool) -> Vec<Standardizer> {
    TRACKED_STATS
        .iter()
        .map(|col| {
            let values: Vec<f64> = pool.undrafted().map(|p| col.value(&p.line)).collect();
            Standardizer::fit(&values)
        })
        .collect()
}

fn transform_row(player: &PoolPlayer, standardizers: &[Standardizer]) -> StandardizedRow {
    StandardizedRow {
        name: player.name.clone(),
        rank: player.rank,
        adp: player.adp,
        drafted_by: player.drafted_by,
        games_played: player.games_played,
        values: TRACKED_STATS
            .iter()
            .zip(standardizers)
            .map(|(col, s)| s.transform(col.value(&player.line)))
            .collect(),
    }
}

fn transform_pool(pool: &ProjectionPool, standardizers: &[Standardizer]) -> StandardizedTable {
    StandardizedTable {
        columns: TRACKED_STATS.iter().map(|c| c.label().to_string()).collect(),
        rows: pool
            .players()
            .iter()
            .map(|p| transform_row(p, standardizers))
            .collect(),
    }
}

impl DraftSession {
    /// Start a session in the Unfitted state.
    pub fn new(pool: ProjectionPool) -> DraftSession {
        DraftSession {
            pool,
            standardizers: None,
            standardized: None,
        }
    }

    pub fn pool(&self) -> &ProjectionPool {
        &self.pool
    }

    pub fn is_fitted(&self) -> bool {
        self.standardizers.is_some()
    }

    /// The current standardized view, if one has been published.
    pub fn standardized(&self) -> Option<&StandardizedTable> {
        self.standardized.as_ref()
    }

    /// Fit standardization parameters from the currently-undrafted rows.
    pub fn refit(&mut self) {
        self.standardizers = Some(fit_all(&self.pool));
    }

    /// Transform every row with the current fit. Usage error while Unfitted.
    pub fn apply(&self) -> Result<StandardizedTable, StandardizeError> {
        let standardizers = self
            .standardizers
            .as_ref()
            .ok_or(StandardizeError::NotFitted)?;
        Ok(transform_pool(&self.pool, standardizers))
    }

    /// Refit and apply in one step, publishing the standardized view. Used
    /// at session start and internally after edits.
    pub fn refresh(&mut self) -> &StandardizedTable {
        let standardizers = fit_all(&self.pool);
        let table = transform_pool(&self.pool, &standardizers);
        self.standardizers = Some(standardizers);
        self.standardized.insert(table)
    }

    /// Apply a set of `row index → drafted_by` edits, then refit against the
    /// new undrafted partition and re-standardize the whole pool.
    ///
    /// The new pool, fit, and view are computed in full before any of them
    /// is published, so no reader can observe a stale fit against the new
    /// partition (or vice versa). Invalid indices reject the whole edit.
    pub fn on_draft_edit(
        &mut self,
        edits: &BTreeMap<usize, u32>,
    ) -> Result<&StandardizedTable, StandardizeError> {
        let len = self.pool.len();
        let mut column = self.pool.drafted_column();
        for (&index, &drafted_by) in edits {
            let slot = column
                .get_mut(index)
                .ok_or(StandardizeError::RowOutOfBounds { index, len })?;
            *slot = drafted_by;
        }

        let pool = self.pool.with_drafted_column(column);
        let standardizers = fit_all(&pool);
        let table = transform_pool(&pool, &standardizers);
        debug!(
            edits = edits.len(),
            undrafted = pool.undrafted().count(),
            "draft edit applied, pool re-standardized"
        );

        self.pool = pool;
        self.standardizers = Some(standardizers);
        Ok(self.standardized.insert(table))
    }

    /// Sum the standardized stats of each drafted team (the undrafted bucket
    /// is omitted). Rows come back sorted by team identifier.
    pub fn compare_teams(&self) -> Result<Vec<DraftTeamRow>, StandardizeError> {
        let table = self
            .standardized
            .as_ref()
            .ok_or(StandardizeError::NotFitted)?;

        let mut teams: BTreeMap<u32, DraftTeamRow> = BTreeMap::new();
        for row in &table.rows {
            if row.drafted_by == 0 {
                continue;
            }
            let entry = teams.entry(row.drafted_by).or_insert_with(|| DraftTeamRow {
                drafted_by: row.drafted_by,
                games_played: 0.0,
                totals: vec![0.0; TRACKED_STATS.len()],
            });
            entry.games_played += row.games_played;
            for (total, value) in entry.totals.iter_mut().zip(&row.values) {
                *total += value;
            }
        }
        Ok(teams.into_values().collect())
    }
}
