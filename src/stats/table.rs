// Comparison tables handed to the presentation layer: fixed column order,
// the made/attempted tooltip side-table for the ratio columns, and the
// per-column rank signal used for cell coloring.

use serde::{Deserialize, Serialize};

use crate::stats::{StatCol, StatLine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub name: String,
    pub line: StatLine,
}

/// A team × stat (or roster × stat) table, rows labeled by team or player
/// name, columns in [`StatCol::DISPLAY_ORDER`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub rows: Vec<TableRow>,
}

/// Made/attempted breakdowns for one row's ratio columns, positionally
/// aligned to the main table so a renderer can annotate the FG%/FT% cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioTooltip {
    pub fg: String,
    pub ft: String,
}

impl ComparisonTable {
    pub fn push(&mut self, name: impl Into<String>, line: StatLine) {
        self.rows.push(TableRow {
            name: name.into(),
            line,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns() -> &'static [StatCol] {
        &StatCol::DISPLAY_ORDER
    }

    /// Build the tooltip side-table, one entry per row.
    pub fn tooltips(&self) -> Vec<RatioTooltip> {
        self.rows
            .iter()
            .map(|row| RatioTooltip {
                fg: format!("{:.1}/{:.1}", row.line.fgm, row.line.fga),
                ft: format!("{:.1}/{:.1}", row.line.ftm, row.line.fta),
            })
            .collect()
    }

    /// Best-to-worst rank (1 = best) per row for one column. Higher values
    /// rank better except for turnovers, where lower is better. Ties share
    /// the best applicable rank.
    pub fn rankings(&self, col: StatCol) -> Vec<usize> {
        self.rows
            .iter()
            .map(|row| {
                let value = col.value(&row.line);
                let beaten_by = self
                    .rows
                    .iter()
                    .filter(|other| {
                        let other_value = col.value(&other.line);
                        if col.lower_is_better() {
                            other_value < value
                        } else {
                            other_value > value
                        }
                    })
                    .count();
                beaten_by + 1
            })
            .collect()
    }
}
