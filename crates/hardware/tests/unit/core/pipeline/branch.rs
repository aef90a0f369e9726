//! # Branch Redirect Tests

use minorfi_core::core::pipeline::Edge;
use minorfi_core::core::pipeline::latches::{BranchData, BranchReason, Flag};
use pretty_assertions::assert_eq;

use crate::common::harness::{Harness, config_with};
use crate::common::probes::Probes;

#[test]
fn test_redirect_arrives_after_branch_delay() {
    let config = config_with(|c| c.pipeline.execute_branch_delay = 2);
    let branch = BranchData::new(BranchReason::UnpredictedBranch, 0, 0x8d94, 2, 1);
    let (stages, seen) = Probes::new().branch(20, branch.clone()).build(&config);
    let mut h = Harness::new(&config, stages);

    h.run_to(21);
    let before = h.pipeline.stats().bubble_ticks(Edge::EToF1);
    assert_eq!(before, 21);
    h.eval_at(22);
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::EToF1), before);
    h.eval_at(23);
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::EToF1), before + 1);
    h.run_to(25);

    let seen = seen.borrow();
    assert_eq!(seen.fetch1_branches, vec![(22, branch)]);
    assert!(seen.fetch1_predictions.is_empty());
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::EToF1), 24);
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::F2ToF1), 25);
}

#[test]
fn test_no_branch_record_is_accounted_as_bubble() {
    let config = config_with(|_| {});
    let mut record = BranchData::bubble();
    record.bubble = Flag::CLEAR;
    let (stages, seen) = Probes::new().branch(5, record).build(&config);
    let mut h = Harness::new(&config, stages);
    h.run_to(8);

    // Fetch1 saw a non-bubble slot, yet the edge counts as empty throughout.
    assert_eq!(seen.borrow().fetch1_branches.len(), 1);
    assert_eq!(h.pipeline.stats().bubble_ticks(Edge::EToF1), 8);
}
