// Integration tests for courtcast.
//
// These tests exercise the full system end-to-end using the library crate's
// public API: the CSV/TOML loaders against the fixture files, the stat
// resolution and projection pipeline, the draft session, and the WebSocket
// request/reply loop.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use courtcast::app::{self, AppState};
use courtcast::config::{
    Config, CredentialsConfig, DataPaths, LeagueConfig, PoolQueryConfig,
};
use courtcast::espn::{FantasyTeam, InjuryStatus, League, LineupSlot, Player, PoolSort};
use courtcast::pool;
use courtcast::pool::standardize::DraftSession;
use courtcast::protocol::{ClientMessage, ServerMessage};
use courtcast::stats::resolve::InclusionFlags;
use courtcast::stats::schedule;
use courtcast::ws_server::WsEvent;

use chrono::NaiveDate;
use tokio::sync::mpsc;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to project root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

const SOURCE_KEY: &str = "002026";

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(FIXTURES).join(name)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn avg_map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn player(
    name: &str,
    pro_team: &str,
    injury_status: InjuryStatus,
    entries: &[(&str, f64)],
) -> Player {
    let mut stats = HashMap::new();
    stats.insert(SOURCE_KEY.to_string(), avg_map(entries));
    Player {
        name: name.to_string(),
        pro_team: pro_team.to_string(),
        lineup_slot: LineupSlot::Utility,
        injury_status,
        stats,
    }
}

fn inline_config() -> Config {
    Config {
        league: LeagueConfig {
            id: 123456,
            season: 2026,
            scoring_period: 1,
        },
        source_keys: vec![SOURCE_KEY.to_string()],
        inclusion: InclusionFlags::default(),
        ws_port: 0,
        pool_query: PoolQueryConfig {
            limit: 400,
            sort: PoolSort::OwnershipPct,
        },
        data_paths: DataPaths {
            schedule: format!("{FIXTURES}/schedule.csv"),
            team_ids: format!("{FIXTURES}/team_ids.toml"),
            projections: format!("{FIXTURES}/projections.csv"),
        },
        credentials: CredentialsConfig::default(),
    }
}

/// Two-team league: Sharps roster on BOS, Squares roster on CHI. The Sharps
/// carry an OUT player so inclusion filtering is observable end to end.
fn inline_league() -> League {
    League {
        id: 123456,
        season: 2026,
        teams: vec![
            FantasyTeam {
                id: 1,
                name: "Sharps".to_string(),
                roster: vec![
                    player(
                        "Starter",
                        "BOS",
                        InjuryStatus::Active,
                        &[("PTS", 20.0), ("FGM", 8.0), ("FGA", 15.0), ("TO", 2.0)],
                    ),
                    player(
                        "Hurt Guy",
                        "BOS",
                        InjuryStatus::Out,
                        &[("PTS", 30.0), ("FGM", 11.0), ("FGA", 20.0), ("TO", 4.0)],
                    ),
                ],
            },
            FantasyTeam {
                id: 2,
                name: "Squares".to_string(),
                roster: vec![player(
                    "Rival",
                    "CHI",
                    InjuryStatus::Active,
                    &[("PTS", 14.0), ("FGM", 5.0), ("FGA", 11.0), ("TO", 1.0)],
                )],
            },
        ],
    }
}

fn build_state() -> AppState {
    let config = inline_config();
    let sched = schedule::load_schedule(&fixture("schedule.csv")).unwrap();
    let team_ids = schedule::load_team_ids(&fixture("team_ids.toml")).unwrap();
    let projection_pool = pool::load_pool(&fixture("projections.csv")).unwrap();
    let league = inline_league();
    let player_pool: Vec<Player> = league
        .teams
        .iter()
        .flat_map(|t| t.roster.clone())
        .collect();
    AppState::new(
        config,
        league,
        player_pool,
        sched,
        team_ids,
        DraftSession::new(projection_pool),
    )
}

// ===========================================================================
// Loader fixtures
// ===========================================================================

#[test]
fn projection_fixture_loads_in_adp_order() {
    let pool = pool::load_pool(&fixture("projections.csv")).unwrap();
    assert_eq!(pool.len(), 5);

    let names: Vec<&str> = pool.players().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names[0], "Nikola Jokic");
    assert_eq!(names[4], "Derrick White");

    // Percentage cells carry the made/attempted breakdown.
    let jokic = &pool.players()[0];
    assert!(approx_eq(jokic.line.fgm, 10.1, 1e-9));
    assert!(approx_eq(jokic.line.fga, 17.3, 1e-9));
    assert!(approx_eq(jokic.line.fg_pct, 0.583, 1e-9));
    assert_eq!(jokic.positions, vec!["C".to_string()]);
}

#[test]
fn schedule_fixture_counts_games_over_half_open_range() {
    let sched = schedule::load_schedule(&fixture("schedule.csv")).unwrap();

    // BOS (id 1) plays Jan 5, 7, 8, and 12; the range end is exclusive so
    // Jan 12 does not count.
    assert_eq!(sched.games_in_range(1, date(2026, 1, 5), date(2026, 1, 12)), 3);
    assert_eq!(sched.games_in_range(1, date(2026, 1, 5), date(2026, 1, 13)), 4);
    assert_eq!(sched.games_in_range(2, date(2026, 1, 5), date(2026, 1, 12)), 3);
    // Unknown team id contributes zero games.
    assert_eq!(sched.games_in_range(99, date(2026, 1, 5), date(2026, 1, 13)), 0);
}

#[test]
fn team_id_fixture_normalizes_keys() {
    let team_ids = schedule::load_team_ids(&fixture("team_ids.toml")).unwrap();
    assert_eq!(team_ids.get("BOS"), Some(&1));
    assert_eq!(team_ids.get("CHI"), Some(&2));
    assert_eq!(team_ids.len(), 3);
}

// ===========================================================================
// Request handling end to end
// ===========================================================================

#[test]
fn league_summary_recomputes_ratios_and_excludes_out_players() {
    let mut state = build_state();
    let reply = state.handle_request(ClientMessage::LeagueSummary {
        include_day_to_day: None,
        include_out: None,
    });
    let ServerMessage::LeagueSummary { payload } = reply else {
        panic!("expected LeagueSummary");
    };

    let sharps = &payload.table.rows[0];
    assert_eq!(sharps.name, "Sharps");
    // Only the active starter contributes; the OUT player is filtered.
    assert!(approx_eq(sharps.line.pts, 20.0, 1e-9));
    // FG% comes from summed components, not from averaging percentages.
    assert!(approx_eq(sharps.line.fg_pct, 8.0 / 15.0, 1e-9));

    // Tooltip annotates the made/attempted breakdown.
    assert_eq!(payload.tooltips[0].fg, "8.0/15.0");
}

#[test]
fn league_summary_include_out_override_adds_the_injured_line() {
    let mut state = build_state();
    let reply = state.handle_request(ClientMessage::LeagueSummary {
        include_day_to_day: None,
        include_out: Some(true),
    });
    let ServerMessage::LeagueSummary { payload } = reply else {
        panic!("expected LeagueSummary");
    };

    let sharps = &payload.table.rows[0];
    assert!(approx_eq(sharps.line.pts, 50.0, 1e-9));
    assert!(approx_eq(sharps.line.fg_pct, 19.0 / 35.0, 1e-9));
}

#[test]
fn league_summary_ranks_turnovers_ascending() {
    let mut state = build_state();
    let reply = state.handle_request(ClientMessage::LeagueSummary {
        include_day_to_day: None,
        include_out: None,
    });
    let ServerMessage::LeagueSummary { payload } = reply else {
        panic!("expected LeagueSummary");
    };

    // Sharps score more points (rank 1) but commit more turnovers (rank 2).
    assert_eq!(payload.rankings["PTS"], vec![1, 2]);
    assert_eq!(payload.rankings["TO"], vec![2, 1]);
}

#[test]
fn weekly_comparison_scales_by_scheduled_games() {
    let mut state = build_state();
    let reply = state.handle_request(ClientMessage::WeeklyComparison {
        teams: vec!["Sharps".to_string(), "Squares".to_string()],
        start: date(2026, 1, 5),
        end: date(2026, 1, 12),
        include_day_to_day: None,
        include_out: None,
    });
    let ServerMessage::WeeklyComparison { payload } = reply else {
        panic!("expected WeeklyComparison");
    };

    // 20 pts/game over 3 scheduled games; ratios stay per-ratio, not summed.
    let sharps = &payload.table.rows[0];
    assert!(approx_eq(sharps.line.pts, 60.0, 1e-9));
    assert!(approx_eq(sharps.line.fg_pct, 8.0 / 15.0, 1e-9));

    let squares = &payload.table.rows[1];
    assert!(approx_eq(squares.line.pts, 42.0, 1e-9));
}

#[test]
fn draft_summary_rejects_unknown_players() {
    let mut state = build_state();
    let mut rosters = BTreeMap::new();
    rosters.insert("Mine".to_string(), vec!["Nobody".to_string()]);
    let reply = state.handle_request(ClientMessage::DraftSummary {
        rosters,
        include_day_to_day: None,
        include_out: None,
    });
    let ServerMessage::Error { message } = reply else {
        panic!("expected Error");
    };
    assert!(message.contains("Nobody"));
}

#[test]
fn draft_summary_gives_empty_rosters_a_zero_row() {
    let mut state = build_state();
    let mut rosters = BTreeMap::new();
    rosters.insert("Empty".to_string(), Vec::new());
    rosters.insert("Mine".to_string(), vec!["Starter".to_string()]);
    let reply = state.handle_request(ClientMessage::DraftSummary {
        rosters,
        include_day_to_day: None,
        include_out: None,
    });
    let ServerMessage::DraftSummary { payload } = reply else {
        panic!("expected DraftSummary");
    };

    assert_eq!(payload.table.rows.len(), 2);
    let empty = &payload.table.rows[0];
    assert_eq!(empty.name, "Empty");
    assert!(approx_eq(empty.line.pts, 0.0, 1e-9));
    assert!(approx_eq(empty.line.fg_pct, 0.0, 1e-9));
}

// ===========================================================================
// Draft session through the request layer
// ===========================================================================

#[test]
fn standardized_values_are_mean_zero_over_the_undrafted_pool() {
    let mut state = build_state();
    let reply = state.handle_request(ClientMessage::Standardized);
    let ServerMessage::Standardized { table } = reply else {
        panic!("expected Standardized");
    };

    assert_eq!(table.rows.len(), 5);
    assert_eq!(table.columns.len(), 9);
    let pts_idx = table
        .columns
        .iter()
        .position(|c| c == "PTS")
        .unwrap();
    let sum: f64 = table.rows.iter().map(|r| r.values[pts_idx]).sum();
    assert!(approx_eq(sum, 0.0, 1e-9));
}

#[test]
fn draft_edit_refits_on_the_remaining_pool() {
    let mut state = build_state();

    let before = match state.handle_request(ClientMessage::Standardized) {
        ServerMessage::Standardized { table } => table,
        other => panic!("unexpected reply {other:?}"),
    };

    // Draft the top-ranked player to team 1; the fit now excludes them.
    let mut edits = BTreeMap::new();
    edits.insert(0_usize, 1_u32);
    let after = match state.handle_request(ClientMessage::DraftEdit { edits }) {
        ServerMessage::Standardized { table } => table,
        other => panic!("unexpected reply {other:?}"),
    };

    assert_eq!(after.rows[0].drafted_by, 1);
    // The partition changed, so the standardized values must change too.
    let pts_idx = after.columns.iter().position(|c| c == "PTS").unwrap();
    assert!(!approx_eq(
        before.rows[1].values[pts_idx],
        after.rows[1].values[pts_idx],
        1e-12
    ));

    // The new fit is mean-zero over the four undrafted rows.
    let sum: f64 = after
        .rows
        .iter()
        .filter(|r| r.drafted_by == 0)
        .map(|r| r.values[pts_idx])
        .sum();
    assert!(approx_eq(sum, 0.0, 1e-9));
}

#[test]
fn rejected_draft_edit_leaves_the_session_unchanged() {
    let mut state = build_state();
    let before = match state.handle_request(ClientMessage::Standardized) {
        ServerMessage::Standardized { table } => table,
        other => panic!("unexpected reply {other:?}"),
    };

    let mut edits = BTreeMap::new();
    edits.insert(0_usize, 1_u32);
    edits.insert(500_usize, 2_u32);
    let reply = state.handle_request(ClientMessage::DraftEdit { edits });
    assert!(matches!(reply, ServerMessage::Error { .. }));

    // The valid part of the batch must not have been applied either.
    let after = match state.handle_request(ClientMessage::Standardized) {
        ServerMessage::Standardized { table } => table,
        other => panic!("unexpected reply {other:?}"),
    };
    assert_eq!(before, after);
}

#[test]
fn team_comparison_totals_drafted_players() {
    let mut state = build_state();
    let mut edits = BTreeMap::new();
    edits.insert(0_usize, 1_u32);
    edits.insert(1_usize, 1_u32);
    edits.insert(2_usize, 2_u32);
    state.handle_request(ClientMessage::DraftEdit { edits });

    let reply = state.handle_request(ClientMessage::TeamComparison);
    let ServerMessage::TeamComparison { teams } = reply else {
        panic!("expected TeamComparison");
    };

    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].drafted_by, 1);
    assert_eq!(teams[1].drafted_by, 2);
    // Jokic (79 GP) + Doncic (70 GP) drafted to team 1.
    assert!(approx_eq(teams[0].games_played, 149.0, 1e-9));
}

// ===========================================================================
// WebSocket request/reply loop
// ===========================================================================

#[tokio::test]
async fn event_loop_round_trips_json_requests() {
    let (ws_tx, ws_rx) = mpsc::channel(16);
    let (reply_tx, mut reply_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(ws_rx, reply_tx, build_state()));

    ws_tx
        .send(WsEvent::Connected {
            addr: "127.0.0.1:50000".to_string(),
        })
        .await
        .unwrap();
    ws_tx
        .send(WsEvent::Request(
            r#"{"type":"league_summary"}"#.to_string(),
        ))
        .await
        .unwrap();

    let reply: ServerMessage = serde_json::from_str(&reply_rx.recv().await.unwrap()).unwrap();
    let ServerMessage::LeagueSummary { payload } = reply else {
        panic!("expected LeagueSummary");
    };
    assert_eq!(payload.table.rows.len(), 2);

    // Draft edit and readback through the same loop, in order.
    ws_tx
        .send(WsEvent::Request(
            r#"{"type":"draft_edit","edits":{"0":3}}"#.to_string(),
        ))
        .await
        .unwrap();
    ws_tx
        .send(WsEvent::Request(r#"{"type":"standardized"}"#.to_string()))
        .await
        .unwrap();

    let edited: ServerMessage = serde_json::from_str(&reply_rx.recv().await.unwrap()).unwrap();
    assert!(matches!(edited, ServerMessage::Standardized { .. }));
    let readback: ServerMessage = serde_json::from_str(&reply_rx.recv().await.unwrap()).unwrap();
    let ServerMessage::Standardized { table } = readback else {
        panic!("expected Standardized");
    };
    assert_eq!(table.rows[0].drafted_by, 3);

    ws_tx
        .send(WsEvent::Request("{bogus".to_string()))
        .await
        .unwrap();
    let error: ServerMessage = serde_json::from_str(&reply_rx.recv().await.unwrap()).unwrap();
    assert!(matches!(error, ServerMessage::Error { .. }));

    drop(ws_tx);
    handle.await.unwrap().unwrap();
}
