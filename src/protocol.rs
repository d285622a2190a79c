// JSON protocol between the dashboard client and the app event loop.
//
// Requests carry optional inclusion-flag overrides; when absent, the
// configured defaults (both false) apply.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pool::standardize::{DraftTeamRow, StandardizedTable};
use crate::stats::table::{ComparisonTable, RatioTooltip};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Whole-league snapshot of per-game averages.
    LeagueSummary {
        #[serde(default)]
        include_day_to_day: Option<bool>,
        #[serde(default)]
        include_out: Option<bool>,
    },
    /// Ranged comparison over `[start, end)` for the selected teams.
    WeeklyComparison {
        teams: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        #[serde(default)]
        include_day_to_day: Option<bool>,
        #[serde(default)]
        include_out: Option<bool>,
    },
    /// Hypothetical rosters built in the team-builder view.
    DraftSummary {
        rosters: BTreeMap<String, Vec<String>>,
        #[serde(default)]
        include_day_to_day: Option<bool>,
        #[serde(default)]
        include_out: Option<bool>,
    },
    /// `row index → drafted_by` edits from the draft board.
    DraftEdit { edits: BTreeMap<usize, u32> },
    /// Current standardized projection table.
    Standardized,
    /// Standardized totals grouped by drafting team.
    TeamComparison,
}

/// A comparison table plus its render hints, ready for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    pub columns: Vec<String>,
    pub table: ComparisonTable,
    /// One tooltip per row, annotating the FG%/FT% cells.
    pub tooltips: Vec<RatioTooltip>,
    /// Best-to-worst rank per row, keyed by column label.
    pub rankings: BTreeMap<String, Vec<usize>>,
}

impl TablePayload {
    pub fn new(table: ComparisonTable) -> TablePayload {
        let columns: Vec<String> = ComparisonTable::columns()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        let tooltips = table.tooltips();
        let rankings = ComparisonTable::columns()
            .iter()
            .map(|col| (col.label().to_string(), table.rankings(*col)))
            .collect();
        TablePayload {
            columns,
            table,
            tooltips,
            rankings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    LeagueSummary { payload: TablePayload },
    WeeklyComparison { payload: TablePayload },
    DraftSummary { payload: TablePayload },
    Standardized { table: StandardizedTable },
    TeamComparison { teams: Vec<DraftTeamRow> },
    Error { message: String },
}
