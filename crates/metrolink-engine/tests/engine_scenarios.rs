//! End-to-end encodings of the literal scenarios in spec.md §8 (S1-S6,
//! B1-B3), run against small fixture graphs via the public crate API.

use chrono::{DateTime, Duration, Utc};

use metrolink_engine::{locator, run_tick, EngineState};
use metrolink_feed::{DefaultAliasTable, RawPidRecord};
use metrolink_graph::{NetworkGraph, NetworkGraphBuilder};
use metrolink_learning::LearnedStore;
use metrolink_tram::{Carriages, Destination, Location, PidRow, Status, Tram};

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn abc_line() -> NetworkGraph {
    NetworkGraphBuilder::new()
        .platform("A", "1", (0.0, 0.0))
        .platform("B", "1", (1.0, 0.0))
        .platform("C", "1", (2.0, 0.0))
        .edge("A_1", "B_1")
        .edge("B_1", "C_1")
        .build()
        .unwrap()
}

fn empty_record(station: &str, atco: &str, last_updated: &str) -> RawPidRecord {
    RawPidRecord {
        StationLocation: station.to_owned(),
        AtcoCode: atco.to_owned(),
        Direction: "Incoming".to_owned(),
        LastUpdated: last_updated.to_owned(),
        MessageBoard: "<no message>".to_owned(),
        dest0: String::new(),
        dest1: String::new(),
        dest2: String::new(),
        dest3: String::new(),
        carriages0: String::new(),
        carriages1: String::new(),
        carriages2: String::new(),
        carriages3: String::new(),
        status0: String::new(),
        status1: String::new(),
        status2: String::new(),
        status3: String::new(),
        wait0: String::new(),
        wait1: String::new(),
        wait2: String::new(),
        wait3: String::new(),
    }
}

fn with_slot0(
    mut record: RawPidRecord,
    dest: &str,
    carriages: &str,
    status: &str,
    wait: &str,
) -> RawPidRecord {
    record.dest0 = dest.to_owned();
    record.carriages0 = carriages.to_owned();
    record.status0 = status.to_owned();
    record.wait0 = wait.to_owned();
    record
}

/// S1: a tram counts down to departure at the origin `A_1`, then is next
/// seen arriving at `B_1` — the locator must attribute the transit sample to
/// edge `(A_1, B_1)` and end up with exactly one tram in `Here[B_1]`.
#[test]
fn s1_starting_tram_is_located_and_transit_is_sampled() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let tick0 = vec![with_slot0(
        empty_record("A", "1", "2024-01-01T12:00:00Z"),
        "C",
        "Double",
        "Due",
        "2",
    )];
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &tick0,
        Duration::seconds(120),
    );

    let a = graph.node_by_canonical_id("A_1").unwrap();
    let b = graph.node_by_canonical_id("B_1").unwrap();
    assert_eq!(state.node(a).starting.len(), 1, "tick 0 seeds a Starting entry at A_1");

    let tick1 = vec![with_slot0(
        empty_record("A", "1", "2024-01-01T12:00:30Z"),
        "C",
        "Double",
        "Due",
        "1",
    )];
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &tick1,
        Duration::seconds(120),
    );
    assert_eq!(state.node(a).starting.len(), 1, "still one Starting entry, not duplicated");

    // Tick 2: A_1's board has moved on (no record for it this cycle — the
    // feed simply stops reporting it); B_1 now shows the tram as arrived.
    let tick2 = vec![with_slot0(
        empty_record("B", "1", "2024-01-01T12:01:00Z"),
        "C",
        "Double",
        "Arrived",
        "0",
    )];
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &tick2,
        Duration::seconds(120),
    );

    assert_eq!(state.node(b).here.len(), 1, "exactly one tram located at B_1");
    assert_eq!(
        learning.transit_sample_count(a, b),
        1,
        "one transit sample recorded for (A_1, B_1)"
    );
}

/// B1: a `Due` row with `wait = 0` promotes the oldest matching `Approaching`
/// candidate to `Here` on the same tick, rather than minting a fresh tram.
#[test]
fn b1_due_zero_wait_promotes_approaching_same_tick() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let b = graph.node_by_canonical_id("B_1").unwrap();
    let a = graph.node_by_canonical_id("A_1").unwrap();
    let arrived_at = ts("2024-01-01T12:00:00Z");
    let approaching = Tram::new(
        Destination::Station("C".to_owned()),
        None,
        Carriages::Single,
        Location::Between {
            from: a,
            to: b,
            departed_at: None,
        },
        arrived_at,
    );
    state.node_mut(b).approaching.push(approaching);

    let node_state = state.node_mut(b);
    node_state.last_upstream_time = Some(ts("2024-01-01T12:00:30Z"));
    node_state.pid_rows = vec![PidRow {
        dest: Destination::Station("C".to_owned()),
        via: None,
        carriages: Carriages::Single,
        status: Status::Due,
        wait_minutes: 0,
    }];

    locator::run_tick(&graph, &mut state, &mut learning, Duration::seconds(120));

    assert_eq!(state.node(b).here.len(), 1, "promoted into Here on the same tick");
    assert!(state.node(b).approaching.is_empty(), "no longer pending in Approaching");
}

/// B2: a `Terminates Here` destination never seeds a downstream Approaching
/// sighting — there is no concrete graph node to infer a predecessor from.
#[test]
fn b2_terminates_here_seeds_no_approaching() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let b = graph.node_by_canonical_id("B_1").unwrap();
    let node_state = state.node_mut(b);
    node_state.last_upstream_time = Some(ts("2024-01-01T12:00:00Z"));
    node_state.pid_rows = vec![PidRow {
        dest: Destination::TerminatesHere,
        via: None,
        carriages: Carriages::Single,
        status: Status::Due,
        wait_minutes: 2,
    }];

    locator::run_tick(&graph, &mut state, &mut learning, Duration::seconds(120));

    for node in graph.nodes() {
        assert!(
            state.node(node).approaching.is_empty(),
            "no Approaching entry should exist anywhere for a sentinel destination"
        );
    }
}

/// B3: a tram sitting in `Departed` past the retention window is expired —
/// no follow-on departure row ever reanimates it.
#[test]
fn b3_departed_tram_expires_past_retention_window() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let c = graph.node_by_canonical_id("C_1").unwrap();
    let departed_at = ts("2024-01-01T12:00:00Z");
    let mut tram = Tram::new(
        Destination::TerminatesHere,
        None,
        Carriages::Single,
        Location::At(c),
        departed_at,
    );
    tram.departed_at = Some(departed_at);
    state.node_mut(c).departed.push(tram);
    // Well past the 120s retention floor (C_1 is a destination terminus
    // with no outgoing edges, so the floor applies unmodified).
    state.node_mut(c).last_upstream_time = Some(departed_at + Duration::seconds(121));

    locator::run_tick(&graph, &mut state, &mut learning, Duration::seconds(120));

    assert!(state.node(c).departed.is_empty());
}

/// S5: two trams sharing `(dest, via, carriages)` arrive on consecutive
/// ticks; the locator must keep them as two distinct tram objects, matched
/// FIFO against the oldest `Approaching` entry first.
#[test]
fn s5_identical_signature_trams_are_matched_fifo() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let a = graph.node_by_canonical_id("A_1").unwrap();
    let b = graph.node_by_canonical_id("B_1").unwrap();
    let dest = Destination::Station("C".to_owned());

    let older = Tram::new(
        dest.clone(),
        None,
        Carriages::Double,
        Location::Between {
            from: a,
            to: b,
            departed_at: None,
        },
        ts("2024-01-01T11:58:00Z"),
    );
    let younger = Tram::new(
        dest.clone(),
        None,
        Carriages::Double,
        Location::Between {
            from: a,
            to: b,
            departed_at: None,
        },
        ts("2024-01-01T11:59:00Z"),
    );
    state.node_mut(b).approaching.push(older);
    state.node_mut(b).approaching.push(younger);

    let present_row = PidRow {
        dest: dest.clone(),
        via: None,
        carriages: Carriages::Double,
        status: Status::Arrived,
        wait_minutes: 0,
    };

    let node_state = state.node_mut(b);
    node_state.last_upstream_time = Some(ts("2024-01-01T12:00:00Z"));
    node_state.pid_rows = vec![present_row.clone()];
    locator::run_tick(&graph, &mut state, &mut learning, Duration::seconds(120));

    assert_eq!(state.node(b).here.len(), 1);
    assert_eq!(state.node(b).approaching.len(), 1, "the younger candidate is still pending");

    let node_state = state.node_mut(b);
    node_state.last_upstream_time = Some(ts("2024-01-01T12:01:00Z"));
    node_state.pid_rows = vec![present_row];
    locator::run_tick(&graph, &mut state, &mut learning, Duration::seconds(120));

    assert_eq!(state.node(b).here.len(), 2, "both trams are now located, as distinct objects");
    assert!(state.node(b).approaching.is_empty());
}

/// R1: feeding the same PID snapshot twice in a row is idempotent — the
/// second tick changes nothing (the feed is globally stale at every node).
#[test]
fn r1_repeated_identical_snapshot_is_idempotent() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let tick = vec![with_slot0(
        empty_record("A", "1", "2024-01-01T12:00:00Z"),
        "C",
        "Double",
        "Due",
        "3",
    )];
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &tick,
        Duration::seconds(120),
    );
    let a = graph.node_by_canonical_id("A_1").unwrap();
    let starting_after_first = state.node(a).starting.len();

    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &tick,
        Duration::seconds(120),
    );

    assert_eq!(state.node(a).starting.len(), starting_after_first);
}

/// R2: the feed goes absent for a few ticks (no record at all for that
/// node — nothing for the decoder to see), then resumes reporting exactly
/// the same `LastUpdated`/rows it had before the outage. The resumed record
/// is globally stale for that node (spec §4.D rule 2), so the locator never
/// runs for it during the outage or on resumption: bucket contents afterward
/// are identical to what they were right before the outage started.
#[test]
fn r2_outage_then_identical_resumption_changes_nothing() {
    let graph = abc_line();
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(32, 32);

    let steady_tick = vec![with_slot0(
        empty_record("A", "1", "2024-01-01T12:00:00Z"),
        "C",
        "Double",
        "Due",
        "3",
    )];
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &steady_tick,
        Duration::seconds(120),
    );
    let a = graph.node_by_canonical_id("A_1").unwrap();
    let starting_before_outage = state.node(a).starting.len();
    let pid_rows_before_outage = state.node(a).pid_rows.clone();

    // Three ticks with no record at all for A_1 (the feed is down).
    for _ in 0..3 {
        run_tick(
            &graph,
            &mut state,
            &mut learning,
            &DefaultAliasTable,
            &[],
            Duration::seconds(120),
        );
    }
    assert_eq!(state.node(a).starting.len(), starting_before_outage);

    // Feed resumes, reporting exactly the same row and LastUpdated as before.
    run_tick(
        &graph,
        &mut state,
        &mut learning,
        &DefaultAliasTable,
        &steady_tick,
        Duration::seconds(120),
    );

    assert_eq!(state.node(a).starting.len(), starting_before_outage);
    assert_eq!(state.node(a).pid_rows, pid_rows_before_outage);
}
