//! # Statistics Tests
//!
//! Checks the exact statistic names and the percentage arithmetic.

use minorfi_core::core::pipeline::Edge;
use minorfi_core::stats::PipelineStats;
use pretty_assertions::assert_eq;

#[test]
fn test_stat_names() {
    let names: Vec<String> = PipelineStats::new()
        .entries(10)
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "num_cycles",
            "num_snapshot",
            "Pipereg.Cache2Fetch.bubble_ticks",
            "Pipereg.Cache2Fetch.bubble_ticks_percentage",
            "Pipereg.Fetch2Decode.bubble_ticks",
            "Pipereg.Fetch2Decode.bubble_ticks_percentage",
            "Pipereg.Decode2Execute.bubble_ticks",
            "Pipereg.Decode2Execute.bubble_ticks_percentage",
            "Pipereg.Execute2Cache.bubble_ticks",
            "Pipereg.Execute2Cache.bubble_ticks_percentage",
            "Pipereg.Fetch2Cache.bubble_ticks",
            "Pipereg.Fetch2Cache.bubble_ticks_percentage",
        ]
    );
}

#[test]
fn test_percentage_rows() {
    let mut stats = PipelineStats::new();
    stats.add_bubble_ticks(Edge::EToF1, 25);
    let entries = stats.entries(100);
    let row = entries
        .iter()
        .find(|e| e.name == "Pipereg.Execute2Cache.bubble_ticks_percentage")
        .unwrap();
    assert_eq!(row.value, 25.0);
    assert_eq!(stats.total_bubble_ticks(), 25);
}

#[test]
fn test_render_and_json() {
    let mut stats = PipelineStats::new();
    stats.num_snapshot = 4;
    let table = stats.render(4);
    assert!(table.contains("Begin Simulation Statistics"));
    assert!(table.lines().any(|l| l.starts_with("num_snapshot") && l.contains(" 4 ")));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["num_snapshot"], 4);
}
