//! The bundled network description (spec §4.K: "build the static graph from
//! a bundled network description"). A single real Metrolink branch —
//! Altrincham to Piccadilly — modelled as a directed loop: the two termini
//! each have one shared platform trams arrive at and later depart from,
//! intermediate stations have a separate platform per direction, exactly as
//! the real line is signalled. Each terminus additionally has a depot
//! siding with no predecessor edge at all — the genuine origin platform
//! spec §4.E.5 seeds `Starting` trams from, distinct from the shared
//! reversing platform the running line itself loops through.

use metrolink_graph::{NetworkGraph, NetworkGraphBuilder};

/// Intermediate stations in running order, outbound (Piccadilly -> Altrincham).
const LINE: &[&str] = &[
    "Piccadilly",
    "Cornbrook",
    "Deansgate - Castlefield",
    "Old Trafford",
    "Stretford",
    "Dane Road",
    "Sale",
    "Brooklands",
    "Timperley",
    "Navigation Road",
    "Altrincham",
];

/// Platform code of the depot siding at each terminus: no predecessor edge
/// feeds it, so it is the one genuine terminus-origin node per end of the
/// line (spec §4.E.5's "terminus node (no predecessors)").
const DEPOT_PLATFORM: &str = "0";

pub fn bundled_network() -> NetworkGraph {
    let mut builder = NetworkGraphBuilder::new();

    for (index, station) in LINE.iter().enumerate() {
        let x = index as f64;
        if index == 0 || index == LINE.len() - 1 {
            // Termini: a single shared reversing platform plus a depot
            // siding with no incoming edge.
            builder = builder.platform(*station, "1", (x, 0.0));
            builder = builder.platform(*station, DEPOT_PLATFORM, (x, -0.2));
        } else {
            builder = builder.platform(*station, "1", (x, 0.0)); // outbound (towards Altrincham)
            builder = builder.platform(*station, "2", (x, 0.2)); // inbound (towards Piccadilly)
        }
    }

    // Outbound: Piccadilly_1 -> ... -> Altrincham_1.
    for pair in LINE.windows(2) {
        let from = outbound_platform(pair[0]);
        let to = outbound_platform(pair[1]);
        builder = builder.edge(from, to);
    }

    // Inbound: Altrincham_1 -> ... -> Piccadilly_1 (reverse running order).
    for pair in LINE.windows(2).collect::<Vec<_>>().into_iter().rev() {
        let from = inbound_platform(pair[1]);
        let to = inbound_platform(pair[0]);
        builder = builder.edge(from, to);
    }

    // Each terminus depot feeds its shared reversing platform — a tram
    // entering service starts here, with no predecessor of its own.
    for station in [LINE[0], LINE[LINE.len() - 1]] {
        builder = builder.edge(depot_platform(station), outbound_platform(station));
    }

    builder.build().expect("bundled network description is well-formed")
}

fn outbound_platform(station: &str) -> String {
    format!("{station}_1")
}

fn depot_platform(station: &str) -> String {
    format!("{station}_{DEPOT_PLATFORM}")
}

/// Intermediate stations have a distinct inbound platform ("_2"); termini
/// only ever have "_1", which both directions share.
fn inbound_platform(station: &str) -> String {
    if station == LINE[0] || station == LINE[LINE.len() - 1] {
        format!("{station}_1")
    } else {
        format!("{station}_2")
    }
}
