//! # Quiescence Tests

use minorfi_core::core::pipeline::Edge;
use minorfi_core::core::pipeline::activity::StageId;
use minorfi_core::core::pipeline::stages::reference_stages;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{Harness, config_with};
use crate::common::program::ProgramBuilder;

#[test]
fn test_empty_pipeline_idles_after_one_evaluation() {
    let config = config_with(|c| c.pipeline.enable_idling = true);
    let stages = reference_stages(&config, ProgramBuilder::new().build());
    let mut h = Harness::new(&config, stages);

    h.eval_at(5);

    assert!(!h.pipeline.activity().active());
    assert!(!h.pipeline.is_running());
    assert_eq!(h.pipeline.stats().num_snapshot, 1);
    for edge in Edge::ALL {
        assert_eq!(h.pipeline.stats().bubble_ticks(edge), 5, "{edge}");
    }
}

#[test]
fn test_without_idling_the_pipeline_keeps_running() {
    let config = config_with(|c| c.pipeline.enable_idling = false);
    let stages = reference_stages(&config, ProgramBuilder::new().build());
    let mut h = Harness::new(&config, stages);
    h.run_to(3);
    assert!(h.pipeline.is_running());
    assert_eq!(h.pipeline.stats().num_cycles, 3);
}

#[test]
fn test_wakeup_keeps_pipeline_alive_for_one_cycle() {
    let config = config_with(|c| c.pipeline.enable_idling = true);
    let stages = reference_stages(&config, ProgramBuilder::new().build());
    let mut h = Harness::new(&config, stages);
    h.pipeline.stop();

    h.pipeline.wakeup_fetch(0);
    assert!(h.pipeline.is_running());
    assert!(h.pipeline.activity().is_stage_active(StageId::Fetch1));
    h.eval_at(1);
    // Fetch1 is now running and requesting lines.
    assert!(h.pipeline.is_running());
    assert!(!h.pipeline.activity().is_stage_active(StageId::Fetch1));
}

#[rstest]
#[case([1, 1, 1, 1, 1])]
#[case([3, 1, 2, 4, 2])]
#[case([2, 5, 1, 1, 3])]
fn test_untouched_pipeline_is_drained(#[case] delays: [u32; 5]) {
    let config = config_with(|c| {
        c.pipeline.fetch1_to_fetch2_forward_delay = delays[0];
        c.pipeline.fetch1_to_fetch2_backward_delay = delays[1];
        c.pipeline.fetch2_to_decode_forward_delay = delays[2];
        c.pipeline.decode_to_execute_forward_delay = delays[3];
        c.pipeline.execute_branch_delay = delays[4];
    });
    let stages = reference_stages(&config, ProgramBuilder::new().nops(4).build());
    let mut h = Harness::new(&config, stages);

    let longest = u64::from(delays.iter().copied().max().unwrap_or(1));
    h.run_to(longest + 1);

    for edge in Edge::ALL {
        assert!(h.pipeline.buffers().is_empty(edge), "{edge}");
    }
    assert!(h.pipeline.is_drained());
    assert_eq!(h.pipeline.stats().num_snapshot, longest + 1);
    assert!(h.pipeline.stats().total_bubble_ticks() <= 5 * (longest + 1));
}
