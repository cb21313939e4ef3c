use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::Connection;

use siege_tracker::catalog::{Region, StatTable};
use siege_tracker::error::ReportError;
use siege_tracker::report::roster::compare_players;
use siege_tracker::report::{
    Cell, ReportKind, ReportOutcome, ReportRequest, ReportStyle, ReportTable, run_report,
};
use siege_tracker::store;

fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

fn row(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// One tracked player, "Alpha", with a snapshot in every table per entry.
fn history(snaps: &[(&str, HashMap<String, f64>)]) -> Connection {
    let conn = store::open_in_memory().unwrap();
    let player = store::create_player(&conn, "Alpha", "a", Region::Ncsa).unwrap();
    for (ts, values) in snaps {
        let record = store::create_record(&conn, at(ts)).unwrap();
        for table in StatTable::ALL {
            store::write_snapshot(&conn, table, player, record, values).unwrap();
        }
    }
    conn
}

fn request(kind: ReportKind, style: ReportStyle) -> ReportRequest {
    let mut req = ReportRequest::new("Alpha", kind);
    req.style = style;
    req.end = Some(at("2019-04-01 00:00:00"));
    req
}

fn table_for(conn: &Connection, req: &ReportRequest) -> ReportTable {
    match run_report(conn, req).unwrap() {
        ReportOutcome::Table(table) => table,
        other => panic!("expected a table, got {other:?}"),
    }
}

fn text(cell: Option<&Cell>) -> String {
    cell.map(|c| c.to_string()).unwrap_or_default()
}

#[test]
fn ranked_interval_counts_games_and_win_loss() {
    let conn = history(&[
        ("2019-03-01 10:00:00", row(&[("ranked_won", 10.0), ("ranked_lost", 5.0)])),
        ("2019-03-01 12:00:00", row(&[("ranked_won", 12.0), ("ranked_lost", 6.0)])),
    ]);
    let table = table_for(&conn, &request(ReportKind::Ranked, ReportStyle::Incremental));
    assert_eq!(table.title, "Ranked In-Between Progress: Alpha");
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.cell(0, "# Games"), Some(&Cell::Int(3)));
    assert_eq!(table.cell(0, "W"), Some(&Cell::Int(2)));
    assert_eq!(table.cell(0, "L"), Some(&Cell::Int(1)));
    assert_eq!(table.cell(0, "W/L"), Some(&Cell::text("2.000")));
    assert_eq!(
        table.cell(0, "Record"),
        Some(&Cell::text("2019-03-01 10:00:00 to 2019-03-01 12:00:00"))
    );
    assert_eq!(table.footer_cell(0, "Record"), Some(&Cell::text("(Total)")));
    assert_eq!(table.footer_cell(0, "# Games"), Some(&Cell::Int(3)));
}

#[test]
fn zero_deaths_floor_the_ratio_denominator() {
    let conn = history(&[
        ("2019-03-01 10:00:00", row(&[("ranked_death", 5.0), ("ranked_won", 1.0)])),
        (
            "2019-03-01 12:00:00",
            row(&[("ranked_death", 5.0), ("ranked_kill", 7.0), ("ranked_won", 2.0)]),
        ),
    ]);
    let table = table_for(&conn, &request(ReportKind::Ranked, ReportStyle::Incremental));
    assert_eq!(table.cell(0, "D"), Some(&Cell::Int(0)));
    assert_eq!(table.cell(0, "K/D"), Some(&Cell::text("7.000")));
    assert_eq!(table.cell(0, "H/K"), Some(&Cell::text("0.00%")));
}

#[test]
fn intervals_without_games_in_the_mode_are_skipped() {
    let conn = history(&[
        (
            "2019-03-01 10:00:00",
            row(&[
                ("ranked_won", 10.0),
                ("ranked_lost", 5.0),
                ("casual_won", 3.0),
                ("casual_lost", 3.0),
            ]),
        ),
        (
            "2019-03-01 12:00:00",
            row(&[
                ("ranked_won", 10.0),
                ("ranked_lost", 5.0),
                ("casual_won", 4.0),
                ("casual_lost", 3.0),
            ]),
        ),
    ]);
    let ranked = table_for(&conn, &request(ReportKind::Ranked, ReportStyle::Incremental));
    assert!(ranked.rows.is_empty());
    assert_eq!(ranked.footer_cell(0, "# Games"), Some(&Cell::Int(0)));

    let casual = table_for(&conn, &request(ReportKind::Casual, ReportStyle::Incremental));
    assert_eq!(casual.title, "Casual In-Between Progress: Alpha");
    assert_eq!(casual.rows.len(), 1);
    assert_eq!(casual.cell(0, "# Games"), Some(&Cell::Int(1)));
    assert!(casual.column("MMR").is_none());
}

#[test]
fn shared_counters_are_flagged_when_the_other_mode_moved() {
    let conn = history(&[
        (
            "2019-03-01 10:00:00",
            row(&[
                ("ranked_won", 10.0),
                ("ranked_lost", 5.0),
                ("casual_won", 3.0),
                ("casual_lost", 3.0),
                ("assists", 100.0),
                ("headshots", 50.0),
            ]),
        ),
        (
            "2019-03-01 12:00:00",
            row(&[
                ("ranked_won", 11.0),
                ("ranked_lost", 5.0),
                ("casual_won", 4.0),
                ("casual_lost", 3.0),
                ("ranked_kill", 4.0),
                ("assists", 104.0),
                ("headshots", 52.0),
            ]),
        ),
        (
            "2019-03-01 14:00:00",
            row(&[
                ("ranked_won", 12.0),
                ("ranked_lost", 5.0),
                ("casual_won", 4.0),
                ("casual_lost", 3.0),
                ("ranked_kill", 6.0),
                ("assists", 105.0),
                ("headshots", 53.0),
            ]),
        ),
    ]);
    let ranked = table_for(&conn, &request(ReportKind::Ranked, ReportStyle::Incremental));
    assert_eq!(ranked.rows.len(), 2);
    assert_eq!(text(ranked.cell(0, "A")), "4*");
    assert_eq!(text(ranked.cell(0, "HS")), "2*");
    assert_eq!(text(ranked.cell(0, "H/K")), "50.00%*");
    assert_eq!(text(ranked.cell(1, "A")), "1");
    assert_eq!(text(ranked.cell(1, "H/K")), "50.00%");
    assert_eq!(text(ranked.footer_cell(0, "A")), "5*");
    assert_eq!(text(ranked.footer_cell(0, "K")), "6");

    let casual = table_for(&conn, &request(ReportKind::Casual, ReportStyle::Incremental));
    assert_eq!(casual.rows.len(), 1);
    assert_eq!(text(casual.cell(0, "A")), "4*");
}

#[test]
fn cumulative_rows_carry_raw_lifetime_values() {
    let conn = history(&[
        (
            "2019-03-01 10:00:00",
            row(&[
                ("ranked_won", 10.0),
                ("ranked_lost", 5.0),
                ("ranked_kill", 30.0),
                ("ranked_death", 20.0),
                ("assists", 40.0),
                ("headshots", 12.0),
                ("season_wins", 10.0),
                ("season_losses", 5.0),
                ("mmr", 2500.5),
                ("rank", 14.0),
                ("skill_mean", 25.0),
                ("skill_std", 3.0),
            ]),
        ),
        (
            "2019-03-02 10:00:00",
            row(&[
                ("ranked_won", 12.0),
                ("ranked_lost", 6.0),
                ("ranked_kill", 40.0),
                ("ranked_death", 24.0),
                ("assists", 44.0),
                ("headshots", 15.0),
                ("season_wins", 12.0),
                ("season_losses", 6.0),
                ("mmr", 2600.25),
                ("rank", 15.0),
                ("skill_mean", 26.0),
                ("skill_std", 2.5),
            ]),
        ),
        (
            "2019-03-03 10:00:00",
            row(&[
                ("ranked_won", 14.0),
                ("ranked_lost", 6.0),
                ("ranked_kill", 47.0),
                ("ranked_death", 25.0),
                ("assists", 47.0),
                ("headshots", 18.0),
                ("season_wins", 14.0),
                ("season_losses", 6.0),
                ("mmr", 2650.0),
                ("rank", 15.0),
                ("skill_mean", 27.5),
                ("skill_std", 2.25),
            ]),
        ),
    ]);
    let mut req = request(ReportKind::Ranked, ReportStyle::Cumulative);
    req.start = Some(at("2019-03-01 10:00:00"));
    req.end = Some(at("2019-03-03 10:00:00"));
    let table = table_for(&conn, &req);

    assert_eq!(table.title, "Ranked Cumulative Progress: Alpha");
    assert_eq!(table.rows.len(), 3);
    assert_eq!(text(table.cell(0, "Record")), "2019-03-01 10:00:00");
    assert_eq!(table.cell(0, "# Games"), Some(&Cell::Int(15)));
    assert_eq!(table.cell(0, "K"), Some(&Cell::Int(30)));

    assert_eq!(text(table.cell(2, "Record")), "2019-03-03 10:00:00");
    assert_eq!(table.cell(2, "# Games"), Some(&Cell::Int(20)));
    assert_eq!(table.cell(2, "K"), Some(&Cell::Int(47)));
    assert_eq!(table.cell(2, "D"), Some(&Cell::Int(25)));
    assert_eq!(table.cell(2, "W"), Some(&Cell::Int(14)));
    assert_eq!(table.cell(2, "L"), Some(&Cell::Int(6)));
    assert_eq!(text(table.cell(2, "K/D")), "1.8800");
    assert_eq!(text(table.cell(2, "Assists")), "47");
    assert_eq!(text(table.cell(2, "MMR")), "2650.00");
    assert_eq!(text(table.cell(2, "Rank")), "Gold II");

    assert_eq!(text(table.footer_cell(0, "Record")), "(Diff)");
    assert_eq!(table.footer_cell(0, "# Games"), Some(&Cell::Int(5)));
    assert_eq!(table.footer_cell(0, "K"), Some(&Cell::Int(17)));
    assert_eq!(text(table.footer_cell(0, "W/L")), "+0.3333");
    assert_eq!(text(table.footer_cell(0, "MMR")), "+149.50");
    assert_eq!(text(table.footer_cell(0, "Skill")), "+2.50");
    assert_eq!(table.footer_cell(0, "Rank"), Some(&Cell::Int(1)));
}

#[test]
fn daily_buckets_report_their_last_snapshot() {
    let conn = history(&[
        ("2019-03-01 08:00:00", row(&[("ranked_won", 0.0)])),
        ("2019-03-01 20:00:00", row(&[("ranked_won", 2.0)])),
        ("2019-03-02 09:00:00", row(&[("ranked_won", 3.0)])),
        ("2019-03-02 22:00:00", row(&[("ranked_won", 5.0)])),
    ]);
    let mut req = request(ReportKind::Ranked, ReportStyle::Incremental);
    req.end = Some(at("2019-03-03 00:00:00"));
    req.increment_days = 1;
    let table = table_for(&conn, &req);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(text(table.cell(0, "Record")), "2019-03-01 to 2019-03-02");
    assert_eq!(table.cell(0, "W"), Some(&Cell::Int(2)));
    assert_eq!(text(table.cell(1, "Record")), "2019-03-02 to 2019-03-03");
    assert_eq!(table.cell(1, "W"), Some(&Cell::Int(3)));

    req.style = ReportStyle::Cumulative;
    let cumulative = table_for(&conn, &req);
    let labels = cumulative
        .rows
        .iter()
        .map(|r| r[0].to_string())
        .collect::<Vec<_>>();
    assert_eq!(labels, ["2019-03-01 08:00:00", "2019-03-02", "2019-03-03"]);
}

#[test]
fn oversized_increment_is_one_bucket_ending_at_the_range_end() {
    let conn = history(&[
        ("2019-03-01 08:00:00", row(&[("ranked_won", 0.0)])),
        ("2019-03-02 22:00:00", row(&[("ranked_won", 5.0)])),
    ]);
    let mut req = request(ReportKind::Ranked, ReportStyle::Incremental);
    req.end = Some(at("2019-03-03 00:00:00"));
    req.increment_days = 1_000_000_000;
    let table = table_for(&conn, &req);
    assert_eq!(table.rows.len(), 1);
    assert_eq!(text(table.cell(0, "Record")), "2019-03-01 to 2019-03-03");
    assert_eq!(table.cell(0, "W"), Some(&Cell::Int(5)));
}

#[test]
fn bad_requests_are_rejected() {
    let conn = history(&[("2019-03-01 10:00:00", row(&[]))]);

    let mut req = request(ReportKind::Ranked, ReportStyle::Incremental);
    req.start = Some(at("2019-03-05 00:00:00"));
    req.end = Some(at("2019-03-01 00:00:00"));
    assert!(matches!(
        run_report(&conn, &req),
        Err(ReportError::InvalidRange { .. })
    ));

    let ghost = ReportRequest::new("Ghost", ReportKind::Ranked);
    assert!(matches!(
        run_report(&conn, &ghost),
        Err(ReportError::UnknownPlayer(name)) if name == "Ghost"
    ));
}

#[test]
fn fewer_than_two_snapshots_is_insufficient_data() {
    let conn = history(&[("2019-03-01 10:00:00", row(&[("ranked_won", 3.0)]))]);
    let outcome = run_report(&conn, &request(ReportKind::Weapons, ReportStyle::Incremental)).unwrap();
    assert_eq!(
        outcome,
        ReportOutcome::InsufficientData {
            kind: ReportKind::Weapons,
            found: 1
        }
    );

    let empty = history(&[]);
    let outcome = run_report(&empty, &request(ReportKind::Ranked, ReportStyle::Cumulative)).unwrap();
    assert!(outcome.table().is_none());
    assert_eq!(
        outcome,
        ReportOutcome::InsufficientData {
            kind: ReportKind::Ranked,
            found: 0
        }
    );
}

#[test]
fn weapon_sections_list_only_weapons_that_hit() {
    let conn = history(&[
        (
            "2019-03-01 10:00:00",
            row(&[
                ("ranked_won", 4.0),
                ("fired_ar", 300.0),
                ("hit_ar", 100.0),
                ("kill_ar", 10.0),
                ("headshot_ar", 4.0),
                ("fired_smg", 50.0),
                ("hit_smg", 20.0),
            ]),
        ),
        (
            "2019-03-01 12:00:00",
            row(&[
                ("ranked_won", 5.0),
                ("fired_ar", 400.0),
                ("hit_ar", 150.0),
                ("kill_ar", 20.0),
                ("headshot_ar", 9.0),
                ("fired_smg", 50.0),
                ("hit_smg", 20.0),
            ]),
        ),
    ]);
    let table = table_for(&conn, &request(ReportKind::Weapons, ReportStyle::Incremental));
    assert_eq!(table.title, "Gun In-Between Stats: Alpha");
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.cell(0, "# Games"), Some(&Cell::Int(1)));
    assert_eq!(text(table.cell(0, "Ranked W/L")), "1/0");
    assert_eq!(text(table.cell(0, "Casual W/L")), "0/0");
    assert_eq!(text(table.cell(1, "Gun")), "Assault Rifle");
    assert_eq!(table.cell(1, "Hit"), Some(&Cell::Int(50)));
    assert_eq!(text(table.cell(1, "Kill/Hit")), "20.00%");
    assert_eq!(text(table.cell(1, "HS/Kill")), "50.00%");
    assert_eq!(text(table.cell(1, "HS/Hit")), "10.00%");
    assert_eq!(text(table.cell(2, "Gun")), "(Total)");
    assert_eq!(table.footer.len(), 3);
    assert_eq!(text(table.footer_cell(0, "Record")), "(Grand Total)");
}

#[test]
fn operator_sections_show_side_once() {
    let conn = history(&[
        ("2019-03-01 10:00:00", row(&[("casual_won", 1.0)])),
        (
            "2019-03-01 12:00:00",
            row(&[
                ("casual_won", 2.0),
                ("ash_tp", 3720.0),
                ("ash_rw", 3.0),
                ("ash_rl", 1.0),
                ("ash_k", 5.0),
                ("ash_d", 2.0),
                ("thermite_rw", 1.0),
                ("mute_rw", 1.0),
            ]),
        ),
    ]);
    let table = table_for(&conn, &request(ReportKind::Operators, ReportStyle::Incremental));
    assert_eq!(table.title, "Operator In-Between Stats: Alpha");
    assert_eq!(table.rows.len(), 5);
    assert_eq!(text(table.cell(0, "Casual W")), "1");

    assert_eq!(text(table.cell(1, "Side")), "atk");
    assert_eq!(text(table.cell(1, "Operator")), "Ash");
    assert_eq!(text(table.cell(1, "W/L")), "3.000");
    assert_eq!(text(table.cell(1, "K/D")), "2.500");
    assert_eq!(text(table.cell(1, "Survival%")), "50.00%");
    assert_eq!(text(table.cell(1, "Time Played")), "1 hours 2 minutes");

    assert_eq!(table.cell(2, "Side"), Some(&Cell::Blank));
    assert_eq!(text(table.cell(2, "Operator")), "Thermite");
    assert_eq!(text(table.cell(3, "Side")), "def");
    assert_eq!(text(table.cell(3, "Operator")), "Mute");

    assert_eq!(text(table.cell(4, "Side")), "(Total)");
    assert_eq!(table.cell(4, "Round W"), Some(&Cell::Int(5)));
}

#[test]
fn season_report_skips_seasons_without_games() {
    let conn = history(&[]);
    let player = store::find_player_by_name(&conn, "Alpha").unwrap().expect("player");
    store::upsert_season_snapshot(&conn, player.id, 11, &row(&[("mmr", 2500.0)])).unwrap();
    let req = ReportRequest::new("Alpha", ReportKind::Seasons);
    assert_eq!(
        run_report(&conn, &req).unwrap(),
        ReportOutcome::InsufficientData {
            kind: ReportKind::Seasons,
            found: 1
        }
    );

    store::upsert_season_snapshot(
        &conn,
        player.id,
        12,
        &row(&[
            ("season_wins", 20.0),
            ("season_losses", 10.0),
            ("mmr", 2800.0),
            ("max_mmr", 2900.0),
            ("rank", 16.0),
            ("max_rank", 17.0),
            ("skill_mean", 30.0),
            ("skill_std", 2.0),
        ]),
    )
    .unwrap();
    let table = table_for(&conn, &req);
    assert_eq!(table.title, "Season Stats for Alpha");
    assert_eq!(table.rows.len(), 1);
    assert_eq!(text(table.cell(0, "Season Name")), "WIND BASTION");
    assert_eq!(text(table.cell(0, "W/L")), "2.0000");
    assert_eq!(text(table.cell(0, "Last Rank")), "Gold I");
    assert_eq!(text(table.cell(0, "Max Rank")), "Platinum III");
    let low = table.cell(0, "Skill-Low").and_then(Cell::as_f64).unwrap();
    let high = table.cell(0, "Skill-High").and_then(Cell::as_f64).unwrap();
    assert!((low - 26.08).abs() < 1e-9);
    assert!((high - 33.92).abs() < 1e-9);
}

#[test]
fn comparison_orders_players_by_skill() {
    let conn = store::open_in_memory().unwrap();
    let alpha = store::create_player(&conn, "Alpha", "a", Region::Ncsa).unwrap();
    let bravo = store::create_player(&conn, "Bravo", "b", Region::Emea).unwrap();
    let first = store::create_record(&conn, at("2019-03-01 10:00:00")).unwrap();
    let second = store::create_record(&conn, at("2019-03-02 10:00:00")).unwrap();
    store::write_snapshot(&conn, StatTable::Stats, alpha, first, &row(&[("skill_mean", 25.0)])).unwrap();
    store::write_snapshot(&conn, StatTable::Stats, bravo, first, &row(&[("skill_mean", 20.0)])).unwrap();
    store::write_snapshot(
        &conn,
        StatTable::Stats,
        bravo,
        second,
        &row(&[
            ("skill_mean", 30.0),
            ("time_played", 7260.0),
            ("ranked_kill", 6.0),
            ("casual_kill", 2.0),
            ("headshots", 4.0),
        ]),
    )
    .unwrap();

    let table = compare_players(&conn).unwrap();
    let names = table.rows.iter().map(|r| r[0].to_string()).collect::<Vec<_>>();
    assert_eq!(names, ["Bravo", "Alpha"]);
    assert_eq!(text(table.cell(0, "Total Time Played")), "2 hours 1 minutes");
    assert_eq!(text(table.cell(0, "HPK")), "0.5000");
    assert_eq!(table.cell(0, "Skill"), Some(&Cell::Float(30.0)));
}

#[test]
fn rendered_table_has_title_and_footer_separator() {
    let conn = history(&[
        ("2019-03-01 10:00:00", row(&[("ranked_won", 1.0)])),
        ("2019-03-01 12:00:00", row(&[("ranked_won", 2.0)])),
    ]);
    let rendered = table_for(&conn, &request(ReportKind::Ranked, ReportStyle::Incremental)).to_string();
    assert!(rendered.starts_with("Ranked In-Between Progress: Alpha"));
    assert!(rendered.contains("---"));
    assert!(rendered.contains("(Total)"));
}
