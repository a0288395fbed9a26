use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use tennis_edge::config::EngineConfig;
use tennis_edge::export::render_feature_table;
use tennis_edge::features::FeatureRow;
use tennis_edge::match_log::{PlayerBook, RawMatchRow, prepare_matches};
use tennis_edge::rankings::RankingLookup;
use tennis_edge::replay::{TrackerSet, run_replay};

fn raw_match(match_id: &str, date: &str, tourney: &str, winner: u32, loser: u32) -> RawMatchRow {
    RawMatchRow {
        match_id: match_id.to_string(),
        date: Some(date.to_string()),
        tourney_name: tourney.to_string(),
        surface: None,
        winner_id: Some(winner),
        loser_id: Some(loser),
        score: "6-4 6-4".to_string(),
    }
}

fn replay_rows(rows: Vec<RawMatchRow>) -> Vec<FeatureRow> {
    let cfg = EngineConfig::default();
    let prepared = prepare_matches(rows);
    let rankings = RankingLookup::empty(cfg.default_rank);
    let players = PlayerBook::default();
    let mut trackers = TrackerSet::new(&cfg);
    run_replay(&cfg, &prepared.matches, &rankings, &players, &mut trackers)
        .expect("replay succeeds")
        .rows
}

// A=1, B=2, C=3. Hard, Clay, Hard; defaults K=32, D=400, initial 1500.
fn three_match_scenario() -> Vec<RawMatchRow> {
    vec![
        raw_match("m1", "2023-01-01", "Open 13 (hard)", 1, 2),
        raw_match("m2", "2023-01-05", "Rome Masters (clay)", 2, 3),
        raw_match("m3", "2023-01-10", "Open 13 (hard)", 1, 3),
    ]
}

#[test]
fn end_to_end_three_match_scenario() {
    let rows = replay_rows(three_match_scenario());
    assert_eq!(rows.len(), 3);

    // Match 3 pairs A(1) and C(3) on hard court.
    let m3 = &rows[2].features;
    assert_eq!(m3.match_id, "m3");
    assert_eq!((m3.p1_id, m3.p2_id), (1, 3));
    // A's hard rating right before match 3: 1516 from beating B in match 1.
    assert_eq!(m3.p1_elo, 1516.0);
    // C has only played on clay; hard rating still pristine.
    assert_eq!(m3.p2_elo, 1500.0);
    // A is 1-0 overall before match 3.
    assert_eq!(m3.p1_win_perc, 1.0);
    // A and C have never met.
    assert_eq!((m3.p1_h2h_wins, m3.p2_h2h_wins), (0, 0));

    // Match 2 pairs B(2) and C(3); B lost match 1, so win_perc is 0.
    let m2 = &rows[1].features;
    assert_eq!((m2.p1_id, m2.p2_id), (2, 3));
    assert_eq!(m2.p1_win_perc, 0.0);
    // Clay ratings are untouched by the hard-court opener.
    assert_eq!(m2.p1_elo, 1500.0);
    assert_eq!(m2.p2_elo, 1500.0);
    assert_eq!(rows[1].winner, 1);
}

#[test]
fn first_match_rows_carry_pure_defaults() {
    let rows = replay_rows(three_match_scenario());
    let m1 = &rows[0].features;
    assert_eq!(m1.p1_elo, 1500.0);
    assert_eq!(m1.p2_elo, 1500.0);
    assert_eq!(m1.p1_win_perc, 0.0);
    assert_eq!(m1.p1_surface_win_perc, 0.0);
    assert_eq!(m1.p1_rank, 500);
    assert_eq!((m1.p1_h2h_wins, m1.p2_h2h_wins), (0, 0));
    assert_eq!(m1.p1_rest_days, 30);
}

fn synthetic_stream(seed: u64, matches: usize) -> Vec<RawMatchRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid base date");
    let tourneys = [
        "Australian Open (hard)",
        "Rome Masters (clay)",
        "Wimbledon",
        "Challenger Quito",
    ];
    (0..matches)
        .map(|idx| {
            let winner = rng.gen_range(1..=40u32);
            let mut loser = rng.gen_range(1..=40u32);
            while loser == winner {
                loser = rng.gen_range(1..=40u32);
            }
            let date = base
                .checked_add_days(Days::new(idx as u64 / 4))
                .expect("date in range");
            raw_match(
                &format!("m{idx:05}"),
                &date.format("%Y-%m-%d").to_string(),
                tourneys[rng.gen_range(0..tourneys.len())],
                winner,
                loser,
            )
        })
        .collect()
}

#[test]
fn identical_streams_render_byte_identical_tables() {
    let stream = synthetic_stream(42, 400);
    let first = render_feature_table(&replay_rows(stream.clone())).expect("render");
    let second = render_feature_table(&replay_rows(stream)).expect("render");
    assert_eq!(first, second);
}

#[test]
fn input_order_cannot_leak_future_results() {
    // The same matches shuffled on input must produce the same table the
    // sorted stream does: a later match can never contaminate an earlier
    // snapshot however it arrives.
    let stream = synthetic_stream(7, 300);
    let sorted_table = render_feature_table(&replay_rows(stream.clone())).expect("render");

    let mut shuffled = stream;
    shuffled.shuffle(&mut StdRng::seed_from_u64(99));
    let shuffled_table = render_feature_table(&replay_rows(shuffled)).expect("render");

    assert_eq!(sorted_table, shuffled_table);
}

#[test]
fn earlier_outcomes_are_visible_and_later_ones_are_not() {
    // Player 1 plays match A (earlier) and match B (later); B is fed in
    // first to tempt a leak.
    let rows = replay_rows(vec![
        raw_match("b-later", "2023-03-01", "Wimbledon", 1, 3),
        raw_match("a-earlier", "2023-01-01", "Wimbledon", 1, 2),
    ]);

    let earlier = &rows[0].features;
    assert_eq!(earlier.match_id, "a-earlier");
    // Nothing has happened yet from A's point of view.
    assert_eq!(earlier.p1_win_perc, 0.0);
    assert_eq!(earlier.p1_elo, 1500.0);

    let later = &rows[1].features;
    assert_eq!(later.match_id, "b-later");
    // B's snapshot includes A's outcome for player 1.
    assert_eq!(later.p1_win_perc, 1.0);
    assert_eq!(later.p1_elo, 1516.0);
}

#[test]
fn malformed_rows_are_dropped_without_aborting() {
    let mut rows = three_match_scenario();
    rows.push(raw_match("bad-date", "not a date", "Wimbledon", 5, 6));
    rows.push(RawMatchRow {
        winner_id: None,
        ..raw_match("no-winner", "2023-02-01", "Wimbledon", 5, 6)
    });

    let prepared = prepare_matches(rows);
    assert_eq!(prepared.dropped, 2);
    assert_eq!(prepared.matches.len(), 3);

    let cfg = EngineConfig::default();
    let rankings = RankingLookup::empty(cfg.default_rank);
    let players = PlayerBook::default();
    let mut trackers = TrackerSet::new(&cfg);
    let out = run_replay(&cfg, &prepared.matches, &rankings, &players, &mut trackers)
        .expect("replay succeeds without the malformed rows");
    assert_eq!(out.rows.len(), 3);
}

#[test]
fn ranking_history_resolves_point_in_time_ranks() {
    use tennis_edge::match_log::parse_match_date;
    use tennis_edge::rankings::RankingRow;

    let cfg = EngineConfig::default();
    let rankings = RankingLookup::new(
        vec![
            RankingRow {
                date: parse_match_date("2023-01-02").unwrap(),
                player_id: 1,
                rank: 8,
            },
            RankingRow {
                date: parse_match_date("2022-12-01").unwrap(),
                player_id: 1,
                rank: 15,
            },
        ],
        cfg.default_rank,
    );
    let prepared = prepare_matches(vec![
        // Played on the publication day itself: previous rank applies.
        raw_match("m1", "2023-01-02", "Open 13 (hard)", 1, 2),
        raw_match("m2", "2023-01-09", "Open 13 (hard)", 1, 2),
    ]);
    let players = PlayerBook::default();
    let mut trackers = TrackerSet::new(&cfg);
    let out = run_replay(&cfg, &prepared.matches, &rankings, &players, &mut trackers)
        .expect("replay succeeds");

    assert_eq!(out.rows[0].features.p1_rank, 15);
    assert_eq!(out.rows[1].features.p1_rank, 8);
    // Player 2 has no ranking history at all.
    assert_eq!(out.rows[0].features.p2_rank, cfg.default_rank);
}
