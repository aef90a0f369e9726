//! # Register Fault Injection Tests

use minorfi_core::core::pipeline::Edge;
use minorfi_core::core::pipeline::latches::Payload;
use minorfi_core::core::pipeline::vulnerable::InjectionRecord;
use pretty_assertions::assert_eq;

use crate::common::harness::{Harness, config_with};
use crate::common::probes::{Probes, bundle_for, line_at};

fn inject(comp: &str, time: u64, bit: usize) -> minorfi_core::config::Config {
    config_with(|c| {
        c.fault_injection.inject_comp = comp.to_string();
        c.fault_injection.inject_time = time;
        c.fault_injection.inject_loc = bit;
    })
}

#[test]
fn test_flip_is_seen_by_the_consumer_only() {
    let config = inject("dToE", 50, 3);
    let width = config.pipeline.decode_input_width as usize;
    let line = line_at(0x8000_0100);
    let (stages, seen) = Probes::new().line(47, line.clone()).build(&config);
    let mut h = Harness::new(&config, stages);

    assert_eq!(h.pipeline.pending_injections(), &[Edge::DToE]);
    h.run_to(49);
    assert_eq!(h.pipeline.pending_injections(), &[Edge::DToE]);
    assert!(h.pipeline.injection_log().is_empty());

    h.eval_at(50);
    assert!(h.pipeline.pending_injections().is_empty());
    assert_eq!(
        h.pipeline.injection_log(),
        &[InjectionRecord {
            edge: Edge::DToE,
            tick: 50,
            bit: 3,
        }]
    );

    let original = bundle_for(&line, width);
    let mut corrupted = original.clone();
    assert!(corrupted.flip_bit(3));
    assert_eq!(corrupted.num_insts, 9);

    {
        let seen = seen.borrow();
        assert_eq!(seen.decode_insts, vec![(49, original)]);
        assert_eq!(seen.execute_insts, vec![(50, corrupted)]);
    }

    h.run_to(60);
    assert_eq!(h.pipeline.injection_log().len(), 1);
}

#[test]
fn test_flipped_bubble_flag_still_counts_as_bubble() {
    let config = inject("f2ToF1", 4, 0);
    let (stages, seen) = Probes::new().build(&config);
    let mut h = Harness::new(&config, stages);
    h.run_to(6);

    let seen = seen.borrow();
    assert_eq!(seen.fetch1_predictions.len(), 1);
    assert_eq!(seen.fetch1_predictions[0].0, 4);
    assert!(!seen.fetch1_predictions[0].1.is_branch());
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::F2ToF1), 6);
    assert_eq!(h.pipeline.injection_log().len(), 1);
}

#[test]
fn test_missed_injection_is_dropped() {
    let config = inject("eToF1", 0, 1);
    let (stages, seen) = Probes::new().build(&config);
    let mut h = Harness::new(&config, stages);
    assert_eq!(h.pipeline.pending_injections(), &[Edge::EToF1]);

    h.eval_at(1);
    assert!(h.pipeline.pending_injections().is_empty());
    assert!(h.pipeline.injection_log().is_empty());
    assert!(seen.borrow().fetch1_branches.is_empty());
}

#[test]
fn test_out_of_range_bit_is_dropped() {
    let config = inject("f1ToF2", 2, 100_000);
    let (stages, seen) = Probes::new().build(&config);
    let mut h = Harness::new(&config, stages);
    h.run_to(4);

    assert!(h.pipeline.pending_injections().is_empty());
    assert!(h.pipeline.injection_log().is_empty());
    assert!(seen.borrow().fetch2_lines.is_empty());
}

#[test]
fn test_no_selector_registers_nothing() {
    let config = inject("", 5, 1);
    let (stages, _) = Probes::new().build(&config);
    let mut h = Harness::new(&config, stages);
    assert!(h.pipeline.pending_injections().is_empty());
    h.run_to(10);
    assert!(h.pipeline.injection_log().is_empty());
}
