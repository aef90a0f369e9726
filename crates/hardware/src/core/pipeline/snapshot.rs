//! Pipeline register snapshots and the ASCII bubble renderer.
//!
//! A snapshot records, for each of the five pipeline registers, whether its
//! output wire counts as a bubble, plus the reasons on the two branch
//! registers. The orchestrator takes one before the stages run (what the
//! stages observe, used for bubble accounting) and one after the buffers
//! advance (what was latched). The renderer draws both side by side:
//!
//! ```text
//!      data        _BB_                          _BB_      data
//!      <--- f2ToF1 <-----+                       <--- eToF1 <----+
//!                        |                                       |
//! (F1) ---> f1ToF2 ---> (F2) ---> f2ToD ---> (D) ---> dToE ---> (E)
//!      _BB_        _BB_      data       data     data      data
//! ```
//!
//! Latched values sit next to the producer, observed values next to the
//! consumer. Addresses handled by each stage during the cycle are listed in
//! columns underneath.

use std::fmt::Write as _;

use crate::common::Tick;
use crate::core::pipeline::edge::Edge;
use crate::core::pipeline::latches::BranchReason;

const RULE: &str = "_________________________________________________________________";
const FORWARD_ROW: &str = "(F1) ---> f1ToF2 ---> (F2) ---> f2ToD ---> (D) ---> dToE ---> (E)";

/// Bubble state of every pipeline register at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSnapshot {
    bubble: [bool; Edge::COUNT],
    prediction_reason: BranchReason,
    branch_reason: BranchReason,
}

impl RegisterSnapshot {
    /// Builds a snapshot from per-edge bubble flags and the branch reasons
    /// on `f2ToF1` and `eToF1`.
    pub const fn new(
        bubble: [bool; Edge::COUNT],
        prediction_reason: BranchReason,
        branch_reason: BranchReason,
    ) -> Self {
        Self {
            bubble,
            prediction_reason,
            branch_reason,
        }
    }

    /// Whether `edge` counted as a bubble.
    pub const fn is_bubble(&self, edge: Edge) -> bool {
        self.bubble[edge.index()]
    }

    /// Reason on the `f2ToF1` output.
    pub const fn prediction_reason(&self) -> BranchReason {
        self.prediction_reason
    }

    /// Reason on the `eToF1` output.
    pub const fn branch_reason(&self) -> BranchReason {
        self.branch_reason
    }

    fn label(&self, edge: Edge) -> &'static str {
        if self.is_bubble(edge) { " BB " } else { "data" }
    }
}

/// Addresses each stage handled during one cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageAddrs {
    /// Fetch1 line requests.
    pub fetch1: Vec<String>,
    /// Fetch2 instructions.
    pub fetch2: Vec<String>,
    /// Decode instructions.
    pub decode: Vec<String>,
    /// Execute instructions.
    pub execute: Vec<String>,
}

impl StageAddrs {
    fn rows(&self) -> usize {
        self.fetch1
            .len()
            .max(self.fetch2.len())
            .max(self.decode.len())
            .max(self.execute.len())
    }
}

/// Draws one cycle of the pipeline.
///
/// `observed` is the snapshot taken before the stages evaluated, `latched`
/// the one taken after the buffers advanced.
pub fn render(
    tick: Tick,
    observed: &RegisterSnapshot,
    latched: &RegisterSnapshot,
    addrs: &StageAddrs,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "[SNAPSHOT] Tick: {tick}");

    let mut reasons = String::new();
    for reason in [observed.prediction_reason, observed.branch_reason] {
        if reason != BranchReason::NoBranch {
            let _ = write!(reasons, "{reason}");
        }
    }
    let _ = writeln!(out, "{:5}{:<42}", "", reasons);

    let _ = writeln!(
        out,
        "{:5}{}{:8}{}{:26}{}{:6}{}",
        "",
        observed.label(Edge::F2ToF1),
        "",
        latched.label(Edge::F2ToF1),
        "",
        observed.label(Edge::EToF1),
        "",
        latched.label(Edge::EToF1)
    );
    let _ = writeln!(out, "{:5}<--- f2ToF1 <-----+{:23}<--- eToF1 <----+", "", "");
    let _ = writeln!(out, "{:23}|{:39}|", "", "");
    let _ = writeln!(out, "{FORWARD_ROW}");
    let _ = writeln!(
        out,
        "{:5}{}{:8}{}{:6}{}{:7}{}{:5}{}{:6}{}",
        "",
        latched.label(Edge::F1ToF2),
        "",
        observed.label(Edge::F1ToF2),
        "",
        latched.label(Edge::F2ToD),
        "",
        observed.label(Edge::F2ToD),
        "",
        latched.label(Edge::DToE),
        "",
        observed.label(Edge::DToE)
    );

    let cell = |column: &[String], row: usize| column.get(row).cloned().unwrap_or_default();
    for row in 0..addrs.rows() {
        let _ = writeln!(
            out,
            "{:<20}{:<21}{:<18}{}",
            cell(&addrs.fetch1, row),
            cell(&addrs.fetch2, row),
            cell(&addrs.decode, row),
            cell(&addrs.execute, row)
        );
    }
    out.push('\n');
    out
}
