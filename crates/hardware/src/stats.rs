//! Pipeline statistics collection and reporting.
//!
//! This module tracks the orchestrator's counters. It provides:
//! 1. **Cycles:** Evaluations performed (`num_cycles`) and snapshots taken (`num_snapshot`).
//! 2. **Bubble ticks:** Per pipeline register, the ticks its output carried no useful data.
//! 3. **Reporting:** Named rows (`Pipereg.<edge>.bubble_ticks`, ...) printed as a table or JSON.

use serde::Serialize;

use crate::common::Tick;
use crate::core::pipeline::edge::Edge;

/// One reported statistic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatEntry {
    /// Dotted statistic name.
    pub name: String,
    /// Value (ticks, counts or a percentage).
    pub value: f64,
    /// One-line description.
    pub desc: String,
}

/// Counters maintained by the pipeline orchestrator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Evaluations performed.
    pub num_cycles: u64,
    /// Snapshots taken (one per evaluation).
    pub num_snapshot: u64,
    bubble_ticks: [Tick; Edge::COUNT],
}

impl PipelineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated bubble ticks of `edge`.
    pub const fn bubble_ticks(&self, edge: Edge) -> Tick {
        self.bubble_ticks[edge.index()]
    }

    /// Adds `ticks` to the bubble accumulator of `edge`.
    pub fn add_bubble_ticks(&mut self, edge: Edge, ticks: Tick) {
        self.bubble_ticks[edge.index()] += ticks;
    }

    /// Sum over all edges.
    pub fn total_bubble_ticks(&self) -> Tick {
        self.bubble_ticks.iter().sum()
    }

    /// Share of `sim_ticks` during which `edge` carried a bubble, in percent.
    ///
    /// Zero when no time has been simulated.
    pub fn bubble_percentage(&self, edge: Edge, sim_ticks: Tick) -> f64 {
        if sim_ticks == 0 {
            return 0.0;
        }
        100.0 * self.bubble_ticks(edge) as f64 / sim_ticks as f64
    }

    /// Every statistic as a named row.
    pub fn entries(&self, sim_ticks: Tick) -> Vec<StatEntry> {
        let mut rows = Vec::with_capacity(2 + 2 * Edge::COUNT);
        rows.push(StatEntry {
            name: "num_cycles".to_string(),
            value: self.num_cycles as f64,
            desc: "Number of cycles the pipeline was evaluated".to_string(),
        });
        rows.push(StatEntry {
            name: "num_snapshot".to_string(),
            value: self.num_snapshot as f64,
            desc: "Number of snapshots".to_string(),
        });
        for edge in Edge::ALL {
            rows.push(StatEntry {
                name: format!("Pipereg.{}.bubble_ticks", edge.stat_name()),
                value: self.bubble_ticks(edge) as f64,
                desc: format!("{} How long is it bubble?", edge.arrow()),
            });
            rows.push(StatEntry {
                name: format!("Pipereg.{}.bubble_ticks_percentage", edge.stat_name()),
                value: self.bubble_percentage(edge, sim_ticks),
                desc: format!("{} BB% among total time", edge.arrow()),
            });
        }
        rows
    }

    /// Renders the rows as an aligned `name value # desc` table.
    pub fn render(&self, sim_ticks: Tick) -> String {
        let rows = self.entries(sim_ticks);
        let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0) + 2;
        let mut out = String::new();
        out.push_str("---------- Begin Simulation Statistics ----------\n");
        for row in rows {
            let value = if row.value.fract() == 0.0 {
                format!("{}", row.value as u64)
            } else {
                format!("{:.6}", row.value)
            };
            out.push_str(&format!(
                "{:<width$}{:>16}   # {}\n",
                row.name,
                value,
                row.desc,
                width = width
            ));
        }
        out.push_str("---------- End Simulation Statistics   ----------\n");
        out
    }

    /// Prints the table to stdout.
    pub fn print(&self, sim_ticks: Tick) {
        print!("{}", self.render(sim_ticks));
    }
}
