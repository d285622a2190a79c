// ESPN fantasy v3 API client.
//
// Reads league rosters and the filtered player pool. Private leagues
// authenticate with the `espn_s2` and `SWID` cookies. ESPN identifies pro
// teams, lineup slots, and stats by numeric ids; the maps below translate
// them to the names the rest of the system speaks.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::espn::{
    FantasyTeam, InjuryStatus, League, LeagueProvider, LineupSlot, Player, PoolQuery, PoolSort,
    ProviderError,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Earliest season the v3 player-pool endpoint serves. Queries against
/// older seasons are a usage error, not a retryable failure.
pub const EARLIEST_SEASON: u16 = 2019;

const BASE_URL: &str = "https://lm-api-reads.fantasy.espn.com/apis/v3/games/fba";

/// ESPN numeric stat id → stat name, for the subset the stat line tracks.
const STAT_ID_MAP: [(&str, &str); 11] = [
    ("0", "PTS"),
    ("1", "BLK"),
    ("2", "STL"),
    ("3", "AST"),
    ("6", "REB"),
    ("11", "TO"),
    ("13", "FGM"),
    ("14", "FGA"),
    ("15", "FTM"),
    ("16", "FTA"),
    ("17", "3PM"),
];

/// ESPN lineup slot id → slot string (basketball slot table).
fn slot_name(slot_id: u64) -> &'static str {
    match slot_id {
        0 => "PG",
        1 => "SG",
        2 => "SF",
        3 => "PF",
        4 => "C",
        5 => "G",
        6 => "F",
        11 => "UTIL",
        12 => "BE",
        13 => "IR",
        _ => "BE",
    }
}

/// ESPN pro team id → team code.
fn pro_team_code(team_id: u64) -> &'static str {
    match team_id {
        1 => "ATL",
        2 => "BOS",
        3 => "NOP",
        4 => "CHI",
        5 => "CLE",
        6 => "DAL",
        7 => "DEN",
        8 => "DET",
        9 => "GSW",
        10 => "HOU",
        11 => "IND",
        12 => "LAC",
        13 => "LAL",
        14 => "MIA",
        15 => "MIL",
        16 => "MIN",
        17 => "BKN",
        18 => "NYK",
        19 => "ORL",
        20 => "PHL",
        21 => "PHO",
        22 => "POR",
        23 => "SAC",
        24 => "SAS",
        25 => "OKC",
        26 => "UTA",
        27 => "WAS",
        28 => "TOR",
        29 => "MEM",
        30 => "CHA",
        _ => "FA",
    }
}

/// Private-league cookie pair.
#[derive(Debug, Clone)]
pub struct EspnCredentials {
    pub espn_s2: String,
    pub swid: String,
}

pub struct EspnClient {
    http: reqwest::Client,
    league_id: u64,
    season: u16,
    credentials: Option<EspnCredentials>,
}

impl EspnClient {
    pub fn new(
        league_id: u64,
        season: u16,
        credentials: Option<EspnCredentials>,
    ) -> Result<EspnClient, ProviderError> {
        let http = reqwest::Client::builder().build()?;
        Ok(EspnClient {
            http,
            league_id,
            season,
            credentials,
        })
    }

    fn league_url(&self) -> String {
        format!(
            "{BASE_URL}/seasons/{}/segments/0/leagues/{}",
            self.season, self.league_id
        )
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(url);
        if let Some(creds) = &self.credentials {
            builder = builder.header(
                reqwest::header::COOKIE,
                format!("espn_s2={}; SWID={}", creds.espn_s2, creds.swid),
            );
        }
        builder
    }
}

// ---------------------------------------------------------------------------
// Payload parsing (pure, unit-testable)
// ---------------------------------------------------------------------------

fn parse_stats(player: &Value) -> HashMap<String, HashMap<String, f64>> {
    let stat_names: HashMap<&str, &str> = STAT_ID_MAP.into_iter().collect();
    let mut sources = HashMap::new();

    let Some(entries) = player.get("stats").and_then(Value::as_array) else {
        return sources;
    };
    for entry in entries {
        let Some(source_key) = entry.get("id").and_then(Value::as_str) else {
            continue;
        };
        let Some(averages) = entry.get("averageStats").and_then(Value::as_object) else {
            continue;
        };
        let mut line = HashMap::new();
        for (stat_id, value) in averages {
            let Some(name) = stat_names.get(stat_id.as_str()) else {
                continue;
            };
            if let Some(value) = value.as_f64() {
                line.insert(name.to_string(), value);
            }
        }
        if !line.is_empty() {
            sources.insert(source_key.to_string(), line);
        }
    }
    sources
}

/// Parse one player object (the `player` value inside a roster entry or a
/// pool entry). Returns `None` for entries missing the identity fields.
fn parse_player(player: &Value, lineup_slot_id: Option<u64>) -> Option<Player> {
    let name = player.get("fullName").and_then(Value::as_str)?;
    let pro_team = player
        .get("proTeamId")
        .and_then(Value::as_u64)
        .map(pro_team_code)
        .unwrap_or("FA");
    let injury_status = player
        .get("injuryStatus")
        .and_then(Value::as_str)
        .map(InjuryStatus::from_provider)
        .unwrap_or(InjuryStatus::Active);
    let lineup_slot = LineupSlot::from_provider(slot_name(lineup_slot_id.unwrap_or(12)));

    Some(Player {
        name: name.to_string(),
        pro_team: pro_team.to_string(),
        lineup_slot,
        injury_status,
        stats: parse_stats(player),
    })
}

fn parse_league(payload: &Value, league_id: u64, season: u16) -> Result<League, ProviderError> {
    let teams_json = payload
        .get("teams")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Payload("league response has no `teams` array".into()))?;

    let mut teams = Vec::with_capacity(teams_json.len());
    for team in teams_json {
        let id = team.get("id").and_then(Value::as_u64).unwrap_or(0) as u32;
        let name = team
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Team {id}"));

        let mut roster = Vec::new();
        let entries = team
            .pointer("/roster/entries")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for entry in entries {
            let slot_id = entry.get("lineupSlotId").and_then(Value::as_u64);
            let Some(player_json) = entry.pointer("/playerPoolEntry/player") else {
                continue;
            };
            match parse_player(player_json, slot_id) {
                Some(player) => roster.push(player),
                None => warn!(team = %name, "skipping roster entry without player identity"),
            }
        }
        teams.push(FantasyTeam { id, name, roster });
    }

    Ok(League {
        id: league_id,
        season,
        teams,
    })
}

fn parse_player_pool(payload: &Value) -> Result<Vec<Player>, ProviderError> {
    let entries = payload
        .get("players")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Payload("pool response has no `players` array".into()))?;

    let mut players = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(player_json) = entry.get("player") else {
            continue;
        };
        if let Some(player) = parse_player(player_json, None) {
            players.push(player);
        }
    }
    Ok(players)
}

/// Build the `x-fantasy-filter` header value for a pool query.
fn pool_filter(query: &PoolQuery) -> String {
    let mut players = json!({ "limit": query.limit });
    match query.sort {
        PoolSort::OwnershipPct => {
            players["sortPercOwned"] = json!({ "sortAsc": false, "sortPriority": 1 });
        }
        PoolSort::DraftRank => {
            players["sortDraftRanks"] =
                json!({ "sortAsc": true, "sortPriority": 1, "value": "STANDARD" });
        }
    }
    json!({ "players": players }).to_string()
}

#[async_trait]
impl LeagueProvider for EspnClient {
    async fn fetch_league(&self) -> Result<League, ProviderError> {
        let url = format!("{}?view=mTeam&view=mRoster", self.league_url());
        debug!(league = self.league_id, season = self.season, "fetching league rosters");
        let payload: Value = self.request(&url).send().await?.error_for_status()?.json().await?;
        parse_league(&payload, self.league_id, self.season)
    }

    async fn player_pool(&self, query: &PoolQuery) -> Result<Vec<Player>, ProviderError> {
        if self.season < EARLIEST_SEASON {
            return Err(ProviderError::UnsupportedSeason {
                season: self.season,
                earliest: EARLIEST_SEASON,
            });
        }
        let url = format!(
            "{}?view=kona_player_info&scoringPeriodId={}",
            self.league_url(),
            query.scoring_period
        );
        debug!(limit = query.limit, "fetching player pool");
        let payload: Value = self
            .request(&url)
            .header("x-fantasy-filter", pool_filter(query))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_player_pool(&payload)
    }
}
