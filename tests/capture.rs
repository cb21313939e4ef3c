use chrono::NaiveDateTime;
use rusqlite::Connection;

use siege_tracker::catalog::{Region, StatTable};
use siege_tracker::detector::needs_snapshot;
use siege_tracker::fake_source::FakeStatsSource;
use siege_tracker::remote::RankInfo;
use siege_tracker::store::{self, GameLog, Player};
use siege_tracker::writer::{self, CaptureOutcome};

fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

fn tracked(conn: &Connection, source: &mut FakeStatsSource, pairs: &[(&str, &str)]) -> Vec<Player> {
    for (remote_id, name) in pairs {
        source.add_player(remote_id, name);
        store::create_player(conn, name, remote_id, Region::Ncsa).unwrap();
    }
    store::list_players(conn).unwrap()
}

fn rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn only_players_with_new_games_are_captured() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);

    let first = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();
    assert_eq!(first.record_id, Some(1));
    assert_eq!(first.written(), 2);

    let idle = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 11:00:00")).unwrap();
    assert_eq!(idle.record_id, None);
    assert!(idle.players.is_empty());
    assert_eq!(rows(&conn, "records"), 1);

    source.play_ranked("a", 3.0, 1.0);
    let second = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 12:00:00")).unwrap();
    assert_eq!(second.record_id, Some(2));
    assert_eq!(second.players.len(), 1);
    assert_eq!(second.players[0].player.name, "Alpha");
    assert_eq!(second.players[0].outcome, CaptureOutcome::Written);

    let alpha = &players[0];
    let snap = store::latest_snapshot(&conn, StatTable::Stats, alpha.id)
        .unwrap()
        .expect("snapshot");
    assert_eq!(snap.record_id, 2);
    assert_eq!(snap.get("ranked_won"), 3.0);
    assert_eq!(snap.get("match_played"), 4.0);
    assert_eq!(snap.get("season_wins"), 3.0);
    for table in ["stats", "weapon_stats", "operator_stats"] {
        assert_eq!(rows(&conn, table), 3, "{table}");
    }
    assert_eq!(store::last_record_id(&conn).unwrap(), Some(2));
}

#[test]
fn fractional_counter_growth_is_not_a_new_game() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha")]);
    writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();

    source.set_stat("a", "generalpvp_matchplayed:infinite", 0.4);
    assert_eq!(needs_snapshot(&conn, &mut source, &players), vec![false]);
    source.set_stat("a", "generalpvp_matchplayed:infinite", 1.0);
    assert_eq!(needs_snapshot(&conn, &mut source, &players), vec![true]);
}

#[test]
fn failed_games_lookup_captures_nothing() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha")]);
    source.fail_total_games = true;

    assert_eq!(needs_snapshot(&conn, &mut source, &players), vec![false]);
    let summary = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();
    assert_eq!(summary.record_id, None);
    assert_eq!(source.bulk_calls, 0);
    assert_eq!(rows(&conn, "records"), 0);
}

#[test]
fn force_skips_change_detection() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha")]);
    writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();
    source.fail_total_games = true;

    let forced = writer::capture_players(&mut conn, &mut source, &players, true, at("2019-03-01 11:00:00")).unwrap();
    assert_eq!(forced.written(), 1);
    assert_eq!(rows(&conn, "stats"), 2);
}

#[test]
fn rank_failure_skips_only_that_player() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);
    source.fail_rank_for.insert("b".to_string());

    let summary = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();
    assert_eq!(summary.written(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(matches!(summary.players[1].outcome, CaptureOutcome::Failed(_)));
    assert_eq!(source.bulk_calls, 3);
    assert_eq!(rows(&conn, "stats"), 1);
    assert_eq!(rows(&conn, "operator_stats"), 1);
    assert!(store::latest_snapshot(&conn, StatTable::Stats, players[1].id)
        .unwrap()
        .is_none());
}

#[test]
fn player_missing_from_bulk_payload_is_not_zeroed() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);
    source.play_ranked("a", 10.0, 6.0);
    writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();

    source.play_ranked("a", 1.0, 0.0);
    source.play_ranked("b", 0.0, 1.0);
    source.withheld.insert("a".to_string());
    let summary = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 11:00:00")).unwrap();
    assert!(matches!(&summary.players[0].outcome, CaptureOutcome::Failed(msg) if msg.contains("not found")));
    assert_eq!(summary.players[1].outcome, CaptureOutcome::Written);
    assert_eq!(source.bulk_calls, 6);

    let alpha = store::latest_snapshot(&conn, StatTable::Stats, players[0].id)
        .unwrap()
        .expect("first snapshot");
    assert_eq!(alpha.record_id, 1);
    assert_eq!(alpha.get("ranked_won"), 10.0);
    for table in ["stats", "weapon_stats", "operator_stats"] {
        assert_eq!(rows(&conn, table), 3, "{table}");
    }

    source.withheld.clear();
    let retry = writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 12:00:00")).unwrap();
    assert_eq!(retry.written(), 1);
    let alpha = store::latest_snapshot(&conn, StatTable::Stats, players[0].id)
        .unwrap()
        .expect("retried snapshot");
    assert_eq!(alpha.get("ranked_won"), 11.0);
    assert_eq!(alpha.get("match_played"), 17.0);
}

#[test]
fn bulk_failure_aborts_the_cycle() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha")]);
    source.fail_bulk = true;

    let err = writer::capture_players(&mut conn, &mut source, &players, true, at("2019-03-01 10:00:00")).unwrap_err();
    assert!(format!("{err:#}").contains("fetch stats"));
    assert_eq!(rows(&conn, "records"), 1);
    assert_eq!(rows(&conn, "stats"), 0);
}

#[test]
fn region_detection_prefers_most_games_then_declared_order() {
    let mut source = FakeStatsSource::new();
    source.add_player("a", "Alpha");
    assert_eq!(writer::detect_region(&mut source, "a"), Region::Ncsa);

    let games = |wins: f64| RankInfo {
        wins,
        season: 12,
        ..RankInfo::default()
    };
    source.set_rank("a", Region::Emea, games(10.0));
    source.set_rank("a", Region::Apac, games(10.0));
    assert_eq!(writer::detect_region(&mut source, "a"), Region::Emea);

    source.set_rank("a", Region::Apac, games(11.0));
    assert_eq!(writer::detect_region(&mut source, "a"), Region::Apac);
    assert_eq!(writer::detect_region(&mut source, "nobody"), Region::Ncsa);
}

#[test]
fn adding_a_player_stores_the_remote_name_and_a_first_snapshot() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    source.add_player("a", "AlphaWolf");
    source.set_rank(
        "a",
        Region::Emea,
        RankInfo {
            wins: 4.0,
            losses: 2.0,
            season: 12,
            ..RankInfo::default()
        },
    );

    let (player, summary) = writer::add_player(&mut conn, &mut source, "alphawolf", None).unwrap();
    assert_eq!(player.name, "AlphaWolf");
    assert_eq!(player.region, Region::Emea);
    assert_eq!(summary.written(), 1);
    assert!(store::latest_snapshot(&conn, StatTable::Weapons, player.id)
        .unwrap()
        .is_some());

    assert!(writer::add_player(&mut conn, &mut source, "AlphaWolf", Some(Region::Ncsa)).is_err());
    assert!(writer::add_player(&mut conn, &mut source, "Ghost", None).is_err());
    assert_eq!(store::list_players(&conn).unwrap().len(), 1);
}

#[test]
fn removing_by_local_or_remote_name() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);
    source.rename("b", "BravoNew");

    assert_eq!(writer::remove_player(&mut conn, &mut source, "alpha").unwrap().remote_id, "a");
    assert_eq!(writer::remove_player(&mut conn, &mut source, "BravoNew").unwrap().name, "Bravo");
    assert!(writer::remove_player(&mut conn, &mut source, "Alpha").is_err());
    assert!(store::list_players(&conn).unwrap().is_empty());
}

#[test]
fn name_refresh_reports_renames() {
    let conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);
    source.rename("b", "Bravo2");

    let renamed = writer::refresh_names(&conn, &mut source).unwrap();
    assert_eq!(renamed, vec![("Bravo".to_string(), "Bravo2".to_string())]);
    assert!(store::find_player_by_name(&conn, "Bravo2").unwrap().is_some());
    assert!(writer::refresh_names(&conn, &mut source).unwrap().is_empty());
}

#[test]
fn seasons_are_captured_up_to_the_current_one() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha"), ("b", "Bravo")]);
    source.set_season(
        "a",
        11,
        RankInfo {
            mmr: 2800.0,
            wins: 20.0,
            losses: 15.0,
            ..RankInfo::default()
        },
    );

    assert_eq!(writer::capture_seasons(&mut conn, &mut source).unwrap(), 24);
    let seasons = store::season_snapshots(&conn, players[0].id).unwrap();
    assert_eq!(seasons.len(), 12);
    let eleven = seasons.iter().find(|s| s.season == 11).expect("season 11");
    assert_eq!(eleven.get("mmr"), 2800.0);
    assert_eq!(eleven.get("season_wins"), 20.0);

    source.fail_rank_for.insert("b".to_string());
    assert_eq!(writer::capture_seasons(&mut conn, &mut source).unwrap(), 12);
    assert_eq!(store::season_snapshots(&conn, players[1].id).unwrap().len(), 12);
}

#[test]
fn every_family_is_written_from_the_remote_payload() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let players = tracked(&conn, &mut source, &[("a", "Alpha")]);
    source.play_casual("a", 2.0, 1.0);
    source.set_weapon_stat("a", "weapontypepvp_bullethit:2:infinite", 120.0);
    source.set_operator_stat("a", "operatorpvp_roundwon:3:2:infinite", 7.0);
    source.set_rank(
        "a",
        Region::Ncsa,
        RankInfo {
            mmr: 2710.5,
            skill_stdev: 4.2,
            season: 12,
            ..RankInfo::default()
        },
    );

    writer::capture_players(&mut conn, &mut source, &players, false, at("2019-03-01 10:00:00")).unwrap();
    assert_eq!(source.rank_calls, 1);
    let id = players[0].id;
    let stats = store::latest_snapshot(&conn, StatTable::Stats, id).unwrap().expect("stats");
    assert_eq!(stats.get("casual_won"), 2.0);
    assert_eq!(stats.get("match_played"), 3.0);
    assert_eq!(stats.get("mmr"), 2710.5);
    assert_eq!(stats.get("skill_std"), 4.2);
    assert_eq!(stats.get("ranked_won"), 0.0);
    let weapons = store::latest_snapshot(&conn, StatTable::Weapons, id).unwrap().expect("weapons");
    assert_eq!(weapons.get("hit_smg"), 120.0);
    let operators = store::latest_snapshot(&conn, StatTable::Operators, id)
        .unwrap()
        .expect("operators");
    assert_eq!(operators.get("ash_rw"), 7.0);
    assert_eq!(operators.get("ash_rl"), 0.0);
}

#[test]
fn saving_a_game_without_a_record_forces_a_capture() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    tracked(&conn, &mut source, &[("a", "Alpha")]);
    source.fail_total_games = true;

    let game = GameLog {
        round_wins: Some(4),
        round_losses: Some(3),
        ..GameLog::default()
    };
    let (record_id, _) = writer::save_game(&mut conn, &mut source, None, &game).unwrap();
    assert_eq!(record_id, 1);
    assert_eq!(rows(&conn, "stats"), 1);

    let (again, _) = writer::save_game(&mut conn, &mut source, Some(record_id), &game).unwrap();
    assert_eq!(again, record_id);
    assert_eq!(rows(&conn, "records"), 1);
    assert_eq!(rows(&conn, "games"), 2);

    assert!(writer::save_game(&mut conn, &mut source, Some(9), &game).is_err());
}

#[test]
fn saving_a_game_with_nobody_tracked_still_creates_a_record() {
    let mut conn = store::open_in_memory().unwrap();
    let mut source = FakeStatsSource::new();
    let (record_id, game_id) =
        writer::save_game(&mut conn, &mut source, None, &GameLog::default()).unwrap();
    assert_eq!((record_id, game_id), (1, 1));
    assert_eq!(rows(&conn, "stats"), 0);
}
