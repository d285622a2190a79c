// Application state and orchestration logic.
//
// The central event loop that answers dashboard requests over the WebSocket
// channel. Owns the league snapshot, the projection draft session, and the
// data loaded at startup; every request is handled to completion before the
// next one is read, so draft edits apply in arrival order.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::espn::{League, Player};
use crate::pool::standardize::DraftSession;
use crate::protocol::{ClientMessage, ServerMessage, TablePayload};
use crate::stats::resolve::InclusionFlags;
use crate::stats::schedule::Schedule;
use crate::stats::summary;
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    /// League snapshot fetched at startup.
    pub league: League,
    /// Free-agent/draft player pool fetched at startup.
    pub player_pool: Vec<Player>,
    pub schedule: Schedule,
    /// Pro-team code (e.g. "BOS") to schedule column id.
    pub team_ids: HashMap<String, u32>,
    pub session: DraftSession,
}

impl AppState {
    /// Assemble the application state and fit the draft session so the
    /// standardized table is available from the first request.
    pub fn new(
        config: Config,
        league: League,
        player_pool: Vec<Player>,
        schedule: Schedule,
        team_ids: HashMap<String, u32>,
        mut session: DraftSession,
    ) -> AppState {
        session.refresh();
        AppState {
            config,
            league,
            player_pool,
            schedule,
            team_ids,
            session,
        }
    }

    /// Per-request inclusion flags: explicit overrides win, the configured
    /// defaults fill the gaps.
    fn flags(&self, include_day_to_day: Option<bool>, include_out: Option<bool>) -> InclusionFlags {
        InclusionFlags {
            include_day_to_day: include_day_to_day.unwrap_or(self.config.inclusion.include_day_to_day),
            include_out: include_out.unwrap_or(self.config.inclusion.include_out),
        }
    }

    /// Handle one dashboard request, producing exactly one reply.
    pub fn handle_request(&mut self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::LeagueSummary {
                include_day_to_day,
                include_out,
            } => {
                let flags = self.flags(include_day_to_day, include_out);
                let table =
                    summary::summarize_league(&self.league, &self.config.source_keys, flags);
                ServerMessage::LeagueSummary {
                    payload: TablePayload::new(table),
                }
            }

            ClientMessage::WeeklyComparison {
                teams,
                start,
                end,
                include_day_to_day,
                include_out,
            } => {
                let flags = self.flags(include_day_to_day, include_out);
                match summary::compare_teams(
                    &self.league,
                    &teams,
                    &self.schedule,
                    &self.team_ids,
                    start,
                    end,
                    &self.config.source_keys,
                    flags,
                ) {
                    Ok(table) => ServerMessage::WeeklyComparison {
                        payload: TablePayload::new(table),
                    },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                }
            }

            ClientMessage::DraftSummary {
                rosters,
                include_day_to_day,
                include_out,
            } => {
                let flags = self.flags(include_day_to_day, include_out);
                match summary::summarize_draft(
                    &self.player_pool,
                    &rosters,
                    &self.config.source_keys,
                    flags,
                ) {
                    Ok(table) => ServerMessage::DraftSummary {
                        payload: TablePayload::new(table),
                    },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                }
            }

            ClientMessage::DraftEdit { edits } => match self.session.on_draft_edit(&edits) {
                Ok(table) => ServerMessage::Standardized {
                    table: table.clone(),
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            },

            ClientMessage::Standardized => match self.session.standardized() {
                Some(table) => ServerMessage::Standardized {
                    table: table.clone(),
                },
                // new() refits at startup, so this only fires if construction
                // was bypassed.
                None => ServerMessage::Error {
                    message: "projection pool has not been standardized yet".into(),
                },
            },

            ClientMessage::TeamComparison => match self.session.compare_teams() {
                Ok(teams) => ServerMessage::TeamComparison { teams },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Reads WebSocket events from `ws_rx` and pushes JSON replies through
/// `reply_tx`. Requests are handled one at a time in arrival order, so a
/// draft edit is fully applied before the next request observes the session.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    reply_tx: mpsc::Sender<String>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    while let Some(event) = ws_rx.recv().await {
        match event {
            WsEvent::Connected { addr } => {
                info!("Dashboard connected from {addr}");
            }
            WsEvent::Disconnected => {
                info!("Dashboard disconnected");
            }
            WsEvent::Request(json_str) => {
                let reply = handle_raw_request(&mut state, &json_str);
                match serde_json::to_string(&reply) {
                    Ok(json) => {
                        if reply_tx.send(json).await.is_err() {
                            info!("Reply channel closed, shutting down");
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to serialize reply: {e}"),
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Parse one raw JSON request and dispatch it. Malformed requests produce an
/// error reply instead of tearing down the loop.
fn handle_raw_request(state: &mut AppState, json_str: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(json_str) {
        Ok(msg) => state.handle_request(msg),
        Err(e) => {
            warn!("Failed to parse dashboard request: {e}");
            ServerMessage::Error {
                message: format!("malformed request: {e}"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, CredentialsConfig, DataPaths, LeagueConfig, PoolQueryConfig,
    };
    use crate::espn::{FantasyTeam, InjuryStatus, LineupSlot, PoolSort};
    use crate::pool::{PoolPlayer, ProjectionPool};
    use crate::stats::StatLine;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn avg_map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn player(name: &str, pro_team: &str, pts: f64) -> Player {
        let mut stats = HashMap::new();
        stats.insert(
            "002026".to_string(),
            avg_map(&[("PTS", pts), ("FGM", 8.0), ("FGA", 15.0)]),
        );
        Player {
            name: name.to_string(),
            pro_team: pro_team.to_string(),
            lineup_slot: LineupSlot::Utility,
            injury_status: InjuryStatus::Active,
            stats,
        }
    }

    fn test_config() -> Config {
        Config {
            league: LeagueConfig {
                id: 1,
                season: 2026,
                scoring_period: 1,
            },
            source_keys: vec!["002026".to_string()],
            inclusion: InclusionFlags::default(),
            ws_port: 9101,
            pool_query: PoolQueryConfig {
                limit: 400,
                sort: PoolSort::OwnershipPct,
            },
            data_paths: DataPaths {
                schedule: "data/schedule.csv".into(),
                team_ids: "data/team_ids.toml".into(),
                projections: "data/projections.csv".into(),
            },
            credentials: CredentialsConfig::default(),
        }
    }

    fn pool_player(name: &str, pts: f64) -> PoolPlayer {
        let mut line = StatLine::default();
        line.pts = pts;
        PoolPlayer {
            name: name.to_string(),
            rank: 1,
            adp: 1.0,
            positions: vec!["PG".to_string()],
            team: "BOS".to_string(),
            games_played: 82.0,
            minutes_per_game: 30.0,
            line,
            drafted_by: 0,
        }
    }

    fn test_state() -> AppState {
        let league = League {
            id: 1,
            season: 2026,
            teams: vec![
                FantasyTeam {
                    id: 1,
                    name: "Sharps".to_string(),
                    roster: vec![player("Ayo Dosunmu", "CHI", 20.0)],
                },
                FantasyTeam {
                    id: 2,
                    name: "Squares".to_string(),
                    roster: vec![player("Payton Pritchard", "BOS", 14.0)],
                },
            ],
        };
        let player_pool = vec![
            player("Ayo Dosunmu", "CHI", 20.0),
            player("Payton Pritchard", "BOS", 14.0),
        ];

        let mut schedule = Schedule::new();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut games = HashMap::new();
        games.insert(1_u32, 1_u32);
        games.insert(2_u32, 1_u32);
        schedule.insert_day(day, games).unwrap();

        let mut team_ids = HashMap::new();
        team_ids.insert("BOS".to_string(), 1);
        team_ids.insert("CHI".to_string(), 2);

        let pool = ProjectionPool::new(vec![
            pool_player("Ayo Dosunmu", 20.0),
            pool_player("Payton Pritchard", 14.0),
            pool_player("Derrick White", 17.0),
        ])
        .unwrap();

        AppState::new(
            test_config(),
            league,
            player_pool,
            schedule,
            team_ids,
            DraftSession::new(pool),
        )
    }

    #[test]
    fn new_state_is_fitted() {
        let state = test_state();
        assert!(state.session.is_fitted());
    }

    #[test]
    fn league_summary_has_one_row_per_team() {
        let mut state = test_state();
        let reply = state.handle_request(ClientMessage::LeagueSummary {
            include_day_to_day: None,
            include_out: None,
        });
        let ServerMessage::LeagueSummary { payload } = reply else {
            panic!("expected LeagueSummary");
        };
        assert_eq!(payload.table.rows.len(), 2);
        assert_eq!(payload.tooltips.len(), 2);
    }

    #[test]
    fn weekly_comparison_unknown_team_becomes_error_reply() {
        let mut state = test_state();
        let reply = state.handle_request(ClientMessage::WeeklyComparison {
            teams: vec!["Ghost".to_string()],
            start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            include_day_to_day: None,
            include_out: None,
        });
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[test]
    fn weekly_comparison_inverted_range_yields_empty_table() {
        let mut state = test_state();
        let reply = state.handle_request(ClientMessage::WeeklyComparison {
            teams: vec!["Sharps".to_string()],
            start: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            include_day_to_day: None,
            include_out: None,
        });
        let ServerMessage::WeeklyComparison { payload } = reply else {
            panic!("expected WeeklyComparison");
        };
        assert!(payload.table.rows.is_empty());
    }

    #[test]
    fn draft_summary_resolves_pool_players() {
        let mut state = test_state();
        let mut rosters = BTreeMap::new();
        rosters.insert(
            "My Picks".to_string(),
            vec!["Ayo Dosunmu".to_string(), "Payton Pritchard".to_string()],
        );
        let reply = state.handle_request(ClientMessage::DraftSummary {
            rosters,
            include_day_to_day: None,
            include_out: None,
        });
        let ServerMessage::DraftSummary { payload } = reply else {
            panic!("expected DraftSummary");
        };
        assert_eq!(payload.table.rows.len(), 1);
        assert!((payload.table.rows[0].line.pts - 34.0).abs() < 1e-9);
    }

    #[test]
    fn draft_edit_returns_restandardized_table() {
        let mut state = test_state();
        let mut edits = BTreeMap::new();
        edits.insert(0_usize, 3_u32);
        let reply = state.handle_request(ClientMessage::DraftEdit { edits });
        let ServerMessage::Standardized { table } = reply else {
            panic!("expected Standardized");
        };
        assert_eq!(table.rows[0].drafted_by, 3);
    }

    #[test]
    fn draft_edit_out_of_bounds_is_an_error_reply() {
        let mut state = test_state();
        let mut edits = BTreeMap::new();
        edits.insert(99_usize, 1_u32);
        let reply = state.handle_request(ClientMessage::DraftEdit { edits });
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[test]
    fn standardized_is_available_from_the_first_request() {
        let mut state = test_state();
        let reply = state.handle_request(ClientMessage::Standardized);
        let ServerMessage::Standardized { table } = reply else {
            panic!("expected Standardized");
        };
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn team_comparison_groups_drafted_players() {
        let mut state = test_state();
        let mut edits = BTreeMap::new();
        edits.insert(0_usize, 3_u32);
        edits.insert(1_usize, 3_u32);
        state
            .handle_request(ClientMessage::DraftEdit { edits });

        let reply = state.handle_request(ClientMessage::TeamComparison);
        let ServerMessage::TeamComparison { teams } = reply else {
            panic!("expected TeamComparison");
        };
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].drafted_by, 3);
    }

    #[test]
    fn malformed_request_produces_error_reply() {
        let mut state = test_state();
        let reply = handle_raw_request(&mut state, "{not json");
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn event_loop_replies_to_requests() {
        let (ws_tx, ws_rx) = mpsc::channel(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        let state = test_state();
        let handle = tokio::spawn(run(ws_rx, reply_tx, state));

        ws_tx
            .send(WsEvent::Request(r#"{"type":"standardized"}"#.to_string()))
            .await
            .unwrap();
        let reply = reply_rx.recv().await.unwrap();
        assert!(reply.contains(r#""type":"standardized""#));

        drop(ws_tx);
        handle.await.unwrap().unwrap();
    }
}
