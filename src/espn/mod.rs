// League data provider: data model shared by the core, plus the ESPN client
// and its session cache.
//
// The core only consumes the types in this module; the HTTP specifics live
// in `client` behind the `LeagueProvider` trait so tests can substitute
// in-memory fixtures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod cache;
pub mod client;

// ---------------------------------------------------------------------------
// Player attributes
// ---------------------------------------------------------------------------

/// Injury designation reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryStatus {
    Active,
    DayToDay,
    Questionable,
    Out,
}

impl InjuryStatus {
    /// Map the provider's status string. Unknown statuses are treated as
    /// active so a new provider value never drops a healthy player.
    pub fn from_provider(raw: &str) -> InjuryStatus {
        match raw {
            "DAY_TO_DAY" => InjuryStatus::DayToDay,
            "QUESTIONABLE" => InjuryStatus::Questionable,
            "OUT" => InjuryStatus::Out,
            _ => InjuryStatus::Active,
        }
    }
}

/// Where the player currently sits in the fantasy lineup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineupSlot {
    /// Injured reserve. Always excluded from stat contribution.
    InjuredReserve,
    Bench,
    Utility,
    /// A concrete position slot (PG, SG, SF, PF, C, G, F, ...).
    Position(String),
}

impl LineupSlot {
    pub fn from_provider(raw: &str) -> LineupSlot {
        match raw {
            "IR" => LineupSlot::InjuredReserve,
            "BE" | "Bench" => LineupSlot::Bench,
            "UTIL" => LineupSlot::Utility,
            other => LineupSlot::Position(other.to_string()),
        }
    }
}

/// A player snapshot from the league provider or projection ingester.
///
/// `stats` maps a source key (e.g. "002026" for current-season actuals,
/// "102026" for season projections) to that source's per-game stat averages.
/// Sources may be partial; resolution averages across whatever is present.
/// Read-only once fetched.
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    /// Pro-team code, e.g. "BOS". Joined against the schedule via the
    /// team-name → id mapping.
    pub pro_team: String,
    pub lineup_slot: LineupSlot,
    pub injury_status: InjuryStatus,
    pub stats: HashMap<String, HashMap<String, f64>>,
}

// ---------------------------------------------------------------------------
// League structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FantasyTeam {
    pub id: u32,
    pub name: String,
    pub roster: Vec<Player>,
}

#[derive(Debug, Clone)]
pub struct League {
    pub id: u64,
    pub season: u16,
    pub teams: Vec<FantasyTeam>,
}

impl League {
    /// Look up a team by name. Identity lookups are never defaulted; a miss
    /// is the caller's error to surface.
    pub fn team(&self, name: &str) -> Option<&FantasyTeam> {
        self.teams.iter().find(|t| t.name == name)
    }
}

// ---------------------------------------------------------------------------
// Provider trait and errors
// ---------------------------------------------------------------------------

/// Server-side sort hint for the player-pool query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolSort {
    OwnershipPct,
    DraftRank,
}

/// A paginated, filtered player-pool query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolQuery {
    pub limit: usize,
    pub sort: PoolSort,
    /// The provider requires a scoring-period context when the query does
    /// not make one explicit.
    pub scoring_period: u32,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("season {season} predates provider support (earliest supported is {earliest})")]
    UnsupportedSeason { season: u16, earliest: u16 },

    #[error("league request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected provider payload: {0}")]
    Payload(String),
}

/// Abstract league data provider consumed by the application layer.
#[async_trait]
pub trait LeagueProvider {
    /// Fetch the league with all team rosters.
    async fn fetch_league(&self) -> Result<League, ProviderError>;

    /// Fetch the eligible player pool for the given query.
    async fn player_pool(&self, query: &PoolQuery) -> Result<Vec<Player>, ProviderError>;
}
