//! # Debug Channel Tests

use minorfi_core::core::pipeline::stages::reference_stages;
use tracing::subscriber::with_default;

use crate::common::capture::Capture;
use crate::common::harness::{Harness, config_with};
use crate::common::probes::{Probes, line_at};
use crate::common::program::ProgramBuilder;

#[test]
fn test_bubble_channel_draws_snapshots() {
    let capture = Capture::default();
    let config = config_with(|_| {});
    with_default(capture.subscriber("minorfi::bubble=debug"), || {
        let (stages, _) = Probes::new().line(1, line_at(0x80)).build(&config);
        let mut h = Harness::new(&config, stages);
        h.run_to(3);
    });

    let out = capture.contents();
    assert!(out.contains("[SNAPSHOT] Tick: 1"), "{out}");
    assert!(out.contains("[SNAPSHOT] Tick: 3"), "{out}");
}

#[test]
fn test_bubble_channel_is_silent_when_disabled() {
    let capture = Capture::default();
    let config = config_with(|_| {});
    with_default(capture.subscriber("warn"), || {
        let (stages, _) = Probes::new().build(&config);
        let mut h = Harness::new(&config, stages);
        h.run_to(3);
    });
    assert!(!capture.contents().contains("SNAPSHOT"));
}

#[test]
fn test_print_all_fu_lists_the_pool() {
    let capture = Capture::default();
    let config = config_with(|_| {});
    with_default(capture.subscriber("minorfi::print_all_fu=debug"), || {
        let stages = reference_stages(&config, ProgramBuilder::new().build());
        let _ = Harness::new(&config, stages);
    });

    let out = capture.contents();
    assert!(out.contains("cpu.execute.fu[0] IntAlu"), "{out}");
    assert!(out.contains("cpu.execute.fu[1] IntAlu"), "{out}");
}

#[test]
fn test_drain_channel_reports_completion() {
    let capture = Capture::default();
    let config = config_with(|_| {});
    with_default(capture.subscriber("minorfi::drain=debug"), || {
        let stages = reference_stages(&config, ProgramBuilder::new().nops(40).build());
        let mut h = Harness::new(&config, stages);
        h.pipeline.wakeup_fetch(0);
        h.run_to(5);
        if !h.pipeline.drain() {
            let mut tick = 5;
            while h.pipeline.is_running() && tick < 60 {
                tick += 1;
                h.eval_at(tick);
            }
        }
    });

    let out = capture.contents();
    assert!(out.contains("Draining pipeline by halting inst fetches"), "{out}");
    assert!(out.contains("Signalling end of draining"), "{out}");
}

#[test]
fn test_trace_channel_lists_every_component() {
    let capture = Capture::default();
    let config = config_with(|_| {});
    with_default(capture.subscriber("minorfi::trace=debug"), || {
        let stages = reference_stages(&config, ProgramBuilder::new().nops(4).build());
        let mut h = Harness::new(&config, stages);
        h.eval_at(1);
    });

    let out = capture.contents();
    for name in ["cpu.fetch1", "cpu.fetch2", "cpu.decode", "cpu.execute", "cpu.dToE", "cpu.activity"] {
        assert!(out.contains(name), "missing {name} in {out}");
    }
}
