//! Pipeline register identifiers.
//!
//! The pipeline has five inter-stage registers. Each has three names: the
//! configuration selector used by `injectComp`, the statistics name used in
//! `Pipereg.<name>.*`, and the delay parameter that sizes it.

use std::fmt;

use serde::Serialize;

/// One of the five timed buffers between stages.
///
/// Serializes as its `injectComp` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Edge {
    /// Fetch1 -> Fetch2 cache lines.
    #[serde(rename = "f1ToF2")]
    F1ToF2,
    /// Fetch2 -> Decode instruction bundles.
    #[serde(rename = "f2ToD")]
    F2ToD,
    /// Decode -> Execute instruction bundles.
    #[serde(rename = "dToE")]
    DToE,
    /// Execute -> Fetch1 branches.
    #[serde(rename = "eToF1")]
    EToF1,
    /// Fetch2 -> Fetch1 branch predictions (backward).
    #[serde(rename = "f2ToF1")]
    F2ToF1,
}

impl Edge {
    /// All edges, in statistics order.
    pub const ALL: [Self; 5] = [
        Self::F1ToF2,
        Self::F2ToD,
        Self::DToE,
        Self::EToF1,
        Self::F2ToF1,
    ];

    /// Number of edges.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index into per-edge arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Selector accepted by `injectComp`.
    pub const fn config_name(self) -> &'static str {
        match self {
            Self::F1ToF2 => "f1ToF2",
            Self::F2ToD => "f2ToD",
            Self::DToE => "dToE",
            Self::EToF1 => "eToF1",
            Self::F2ToF1 => "f2ToF1",
        }
    }

    /// Name used in `Pipereg.<name>.bubble_ticks`.
    pub const fn stat_name(self) -> &'static str {
        match self {
            Self::F1ToF2 => "Cache2Fetch",
            Self::F2ToD => "Fetch2Decode",
            Self::DToE => "Decode2Execute",
            Self::EToF1 => "Execute2Cache",
            Self::F2ToF1 => "Fetch2Cache",
        }
    }

    /// Short arrow label used in statistic descriptions.
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::F1ToF2 => "[$->F]",
            Self::F2ToD => "[F->D]",
            Self::DToE => "[D->E]",
            Self::EToF1 => "[E->$]",
            Self::F2ToF1 => "[F->$]",
        }
    }

    /// Parameter that sets this edge's delay.
    pub const fn delay_param(self) -> &'static str {
        match self {
            Self::F1ToF2 => "fetch1ToFetch2ForwardDelay",
            Self::F2ToD => "fetch2ToDecodeForwardDelay",
            Self::DToE => "decodeToExecuteForwardDelay",
            Self::EToF1 => "executeBranchDelay",
            Self::F2ToF1 => "fetch1ToFetch2BackwardDelay",
        }
    }

    /// Payload label shown in buffer traces.
    pub const fn payload_label(self) -> &'static str {
        match self {
            Self::F1ToF2 => "lines",
            Self::F2ToD | Self::DToE => "insts",
            Self::EToF1 => "branch",
            Self::F2ToF1 => "prediction",
        }
    }

    /// Whether data flows against the main dataflow direction.
    pub const fn is_backward(self) -> bool {
        matches!(self, Self::F2ToF1)
    }

    /// Whether bubble accounting and snapshots treat `NoBranch` as a bubble.
    pub const fn carries_branches(self) -> bool {
        matches!(self, Self::EToF1 | Self::F2ToF1)
    }

    /// Looks up an edge by its `injectComp` selector.
    pub fn from_config_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.config_name() == name)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}
