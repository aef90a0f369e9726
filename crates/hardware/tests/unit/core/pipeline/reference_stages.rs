//! # Reference Stage Tests
//!
//! End-to-end runs of small programs through the reference stage models.

use minorfi_core::Simulator;
use minorfi_core::core::ProgramImage;
use minorfi_core::sim::RunReport;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::config_with;
use crate::common::program::ProgramBuilder;

fn run(image: ProgramImage, predict_jumps: bool) -> (RunReport, Simulator) {
    let config = config_with(|c| {
        c.pipeline.enable_idling = true;
        c.pipeline.predict_jumps = predict_jumps;
    });
    let mut sim = Simulator::new(&config, image).unwrap_or_else(|e| panic!("sim: {e}"));
    sim.wakeup_all();
    let _ = sim.run(1_000);
    (sim.report(), sim)
}

#[test]
fn test_straight_line_program_retires_and_idles() {
    let (report, sim) = run(ProgramBuilder::new().nops(6).ecall().build(), false);

    assert_eq!(report.retired_insts, 7);
    assert!(!sim.pipeline().is_running());
    assert!(report.sim_ticks < 1_000);
    assert!(sim.pipeline().is_drained());
}

#[rstest]
#[case::unpredicted(false)]
#[case::predicted(true)]
fn test_jump_skips_shadowed_instruction(#[case] predict_jumps: bool) {
    let program = ProgramBuilder::new().nops(2).jump(8).nops(2).ecall().build();
    let (report, _) = run(program, predict_jumps);
    assert_eq!(report.retired_insts, 5);
}

#[test]
fn test_jump_prediction_does_not_change_committed_stream() {
    let program = || ProgramBuilder::new().nops(2).jump(8).nops(2).ecall().build();
    let (plain, _) = run(program(), false);
    let (predicted, _) = run(program(), true);
    assert_eq!(plain.commit_signature, predicted.commit_signature);
}

#[test]
fn test_ports_count_traffic() {
    let (report, mut sim) = run(ProgramBuilder::new().nops(10).ecall().build(), false);
    assert_eq!(report.retired_insts, 11);

    let port = sim.pipeline_mut().inst_port();
    assert_eq!(port.name(), "cpu.fetch1.icache_port");
    assert!(port.requests() > 0);
    assert!(port.responses() <= port.requests());

    let data = sim.pipeline_mut().data_port();
    assert_eq!(data.name(), "cpu.execute.dcache_port");
    assert_eq!(data.requests(), 0);
}

#[test]
fn test_unwoken_simulator_does_nothing() {
    let config = config_with(|_| {});
    let mut sim = Simulator::new(&config, ProgramBuilder::new().nops(4).build())
        .unwrap_or_else(|e| panic!("sim: {e}"));
    assert_eq!(sim.run(100), 0);
    assert_eq!(sim.pipeline().stats().num_cycles, 0);
    assert_eq!(sim.report().retired_insts, 0);
}
