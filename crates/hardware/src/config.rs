//! Configuration system for the pipeline simulator.
//!
//! This module defines all configuration structures used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline delays, widths, buffer sizes and latencies.
//! 2. **Structures:** Hierarchical config for general, pipeline and fault-injection settings.
//! 3. **Validation:** Range checks that must pass before a pipeline is built.
//!
//! Configuration is supplied as JSON. Field names are snake_case; the gem5-style
//! camelCase parameter names (`executeBranchDelay`, `injectComp`, ...) are
//! accepted as aliases.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::{ConfigError, Tick};
use crate::core::pipeline::edge::Edge;

/// Default configuration constants for the simulator.
mod defaults {
    use crate::common::Tick;

    /// Host ticks per clock cycle.
    pub const CLOCK_PERIOD: Tick = 1;

    /// Number of hardware threads.
    pub const NUM_THREADS: u32 = 1;

    /// Upper bound on simulated ticks for a `run` without an explicit limit.
    pub const MAX_TICKS: Tick = 1_000_000;

    /// Fetch1 -> Fetch2 line latch delay in cycles.
    pub const FETCH1_TO_FETCH2_FORWARD_DELAY: u32 = 1;

    /// Fetch2 -> Fetch1 prediction latch delay in cycles.
    pub const FETCH1_TO_FETCH2_BACKWARD_DELAY: u32 = 1;

    /// Fetch2 -> Decode instruction latch delay in cycles.
    pub const FETCH2_TO_DECODE_FORWARD_DELAY: u32 = 1;

    /// Decode -> Execute instruction latch delay in cycles.
    pub const DECODE_TO_EXECUTE_FORWARD_DELAY: u32 = 1;

    /// Execute -> Fetch1 branch latch delay in cycles.
    pub const EXECUTE_BRANCH_DELAY: u32 = 1;

    /// Micro-op slots per instruction bundle.
    pub const DECODE_INPUT_WIDTH: u32 = 2;

    /// Entries in each stage input buffer.
    pub const INPUT_BUFFER_SIZE: usize = 2;

    /// Bytes per fetched line.
    pub const FETCH_LINE_BYTES: u32 = 16;

    /// Cycles from line request to line response.
    pub const ICACHE_LATENCY: u64 = 1;

    /// Cycles a micro-op spends in a functional unit.
    pub const EXECUTE_LATENCY: u64 = 1;

    /// Functional units (maximum micro-ops in flight in Execute).
    pub const NUM_FUNCTIONAL_UNITS: usize = 2;
}

/// Functional-unit fault-injection repetition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FuInjectionMode {
    /// Inject once; the hook is not called again after it reports success.
    #[default]
    OneShot,
    /// Call the hook on every evaluated cycle.
    Repeat,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use minorfi_core::config::Config;
///
/// let config = Config::from_json(r#"{ "pipeline": { "executeBranchDelay": 2 } }"#).unwrap();
/// assert_eq!(config.pipeline.execute_branch_delay, 2);
/// assert_eq!(config.pipeline.fetch2_to_decode_forward_delay, 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Host and thread settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Pipeline shape and stage model settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Fault injection schedule.
    #[serde(default, alias = "faultInjection")]
    pub fault_injection: FaultInjectionConfig,
}

impl Config {
    /// Parses a configuration from JSON text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error from [`Config::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Config::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint, naming the offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.validate()?;
        self.pipeline.validate()?;
        self.fault_injection.validate()?;
        Ok(())
    }
}

/// Host clock and thread settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Ticks per clock cycle.
    #[serde(default = "GeneralConfig::default_clock_period", alias = "clockPeriod")]
    pub clock_period: Tick,

    /// Hardware threads woken on drain resume.
    #[serde(default = "GeneralConfig::default_num_threads", alias = "numThreads")]
    pub num_threads: u32,

    /// Tick limit for a run.
    #[serde(default = "GeneralConfig::default_max_ticks", alias = "maxTicks")]
    pub max_ticks: Tick,
}

impl GeneralConfig {
    fn default_clock_period() -> Tick {
        defaults::CLOCK_PERIOD
    }

    fn default_num_threads() -> u32 {
        defaults::NUM_THREADS
    }

    fn default_max_ticks() -> Tick {
        defaults::MAX_TICKS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_period < 1 {
            return Err(ConfigError::at_least_one("clockPeriod", self.clock_period));
        }
        if self.num_threads < 1 {
            return Err(ConfigError::at_least_one(
                "numThreads",
                u64::from(self.num_threads),
            ));
        }
        Ok(())
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            clock_period: defaults::CLOCK_PERIOD,
            num_threads: defaults::NUM_THREADS,
            max_ticks: defaults::MAX_TICKS,
        }
    }
}

/// Pipeline shape: latch delays, bundle width, idling, and stage model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Fetch1 -> Fetch2 line latch delay (cycles).
    #[serde(
        default = "PipelineConfig::default_f1_f2",
        alias = "fetch1ToFetch2ForwardDelay"
    )]
    pub fetch1_to_fetch2_forward_delay: u32,

    /// Fetch2 -> Fetch1 prediction latch delay (cycles).
    #[serde(
        default = "PipelineConfig::default_f2_f1",
        alias = "fetch1ToFetch2BackwardDelay"
    )]
    pub fetch1_to_fetch2_backward_delay: u32,

    /// Fetch2 -> Decode latch delay (cycles).
    #[serde(
        default = "PipelineConfig::default_f2_d",
        alias = "fetch2ToDecodeForwardDelay"
    )]
    pub fetch2_to_decode_forward_delay: u32,

    /// Decode -> Execute latch delay (cycles).
    #[serde(
        default = "PipelineConfig::default_d_e",
        alias = "decodeToExecuteForwardDelay"
    )]
    pub decode_to_execute_forward_delay: u32,

    /// Execute -> Fetch1 branch latch delay (cycles).
    #[serde(default = "PipelineConfig::default_e_f1", alias = "executeBranchDelay")]
    pub execute_branch_delay: u32,

    /// Micro-op slots per instruction bundle.
    #[serde(default = "PipelineConfig::default_width", alias = "decodeInputWidth")]
    pub decode_input_width: u32,

    /// Allow the pipeline to suspend itself when no stage has work.
    #[serde(default, alias = "enableIdling")]
    pub enable_idling: bool,

    /// Fetch2 input buffer entries (lines).
    #[serde(
        default = "PipelineConfig::default_buffer",
        alias = "fetch2InputBufferSize"
    )]
    pub fetch2_input_buffer_size: usize,

    /// Decode input buffer entries (bundles).
    #[serde(
        default = "PipelineConfig::default_buffer",
        alias = "decodeInputBufferSize"
    )]
    pub decode_input_buffer_size: usize,

    /// Execute input buffer entries (bundles).
    #[serde(
        default = "PipelineConfig::default_buffer",
        alias = "executeInputBufferSize"
    )]
    pub execute_input_buffer_size: usize,

    /// Bytes per fetched line; must be a multiple of 4.
    #[serde(default = "PipelineConfig::default_line", alias = "fetch1LineWidth")]
    pub fetch_line_bytes: u32,

    /// I-cache response latency (cycles).
    #[serde(default = "PipelineConfig::default_icache", alias = "icacheLatency")]
    pub icache_latency: u64,

    /// Functional-unit latency (cycles).
    #[serde(default = "PipelineConfig::default_exec", alias = "executeLatency")]
    pub execute_latency: u64,

    /// Number of functional units.
    #[serde(default = "PipelineConfig::default_fus", alias = "numFunctionalUnits")]
    pub num_functional_units: usize,

    /// Let Fetch2 predict `JAL` targets and redirect Fetch1 early.
    #[serde(default, alias = "predictJumps")]
    pub predict_jumps: bool,
}

impl PipelineConfig {
    fn default_f1_f2() -> u32 {
        defaults::FETCH1_TO_FETCH2_FORWARD_DELAY
    }

    fn default_f2_f1() -> u32 {
        defaults::FETCH1_TO_FETCH2_BACKWARD_DELAY
    }

    fn default_f2_d() -> u32 {
        defaults::FETCH2_TO_DECODE_FORWARD_DELAY
    }

    fn default_d_e() -> u32 {
        defaults::DECODE_TO_EXECUTE_FORWARD_DELAY
    }

    fn default_e_f1() -> u32 {
        defaults::EXECUTE_BRANCH_DELAY
    }

    fn default_width() -> u32 {
        defaults::DECODE_INPUT_WIDTH
    }

    fn default_buffer() -> usize {
        defaults::INPUT_BUFFER_SIZE
    }

    fn default_line() -> u32 {
        defaults::FETCH_LINE_BYTES
    }

    fn default_icache() -> u64 {
        defaults::ICACHE_LATENCY
    }

    fn default_exec() -> u64 {
        defaults::EXECUTE_LATENCY
    }

    fn default_fus() -> usize {
        defaults::NUM_FUNCTIONAL_UNITS
    }

    /// Configured delay for a pipeline register.
    pub const fn delay(&self, edge: Edge) -> u32 {
        match edge {
            Edge::F1ToF2 => self.fetch1_to_fetch2_forward_delay,
            Edge::F2ToF1 => self.fetch1_to_fetch2_backward_delay,
            Edge::F2ToD => self.fetch2_to_decode_forward_delay,
            Edge::DToE => self.decode_to_execute_forward_delay,
            Edge::EToF1 => self.execute_branch_delay,
        }
    }

    /// Longest forward delay; sizes the activity recorder history.
    pub fn longest_forward_delay(&self) -> u32 {
        self.fetch1_to_fetch2_forward_delay
            .max(self.fetch2_to_decode_forward_delay)
            .max(self.decode_to_execute_forward_delay)
            .max(self.execute_branch_delay)
    }

    /// Checks every pipeline parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] naming the first bad parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for edge in Edge::ALL {
            let delay = self.delay(edge);
            if delay < 1 {
                return Err(ConfigError::at_least_one(
                    edge.delay_param(),
                    u64::from(delay),
                ));
            }
        }
        if self.decode_input_width < 1 {
            return Err(ConfigError::at_least_one(
                "decodeInputWidth",
                u64::from(self.decode_input_width),
            ));
        }
        if self.decode_input_width > u32::from(u8::MAX) {
            return Err(ConfigError::InvalidParameter {
                param: "decodeInputWidth",
                value: u64::from(self.decode_input_width),
                reason: "<= 255",
            });
        }
        let buffers = [
            ("fetch2InputBufferSize", self.fetch2_input_buffer_size),
            ("decodeInputBufferSize", self.decode_input_buffer_size),
            ("executeInputBufferSize", self.execute_input_buffer_size),
            ("numFunctionalUnits", self.num_functional_units),
        ];
        for (param, value) in buffers {
            if value < 1 {
                return Err(ConfigError::at_least_one(param, value as u64));
            }
        }
        if self.fetch_line_bytes < 4 || self.fetch_line_bytes % 4 != 0 {
            return Err(ConfigError::InvalidParameter {
                param: "fetch1LineWidth",
                value: u64::from(self.fetch_line_bytes),
                reason: "a non-zero multiple of 4",
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch1_to_fetch2_forward_delay: defaults::FETCH1_TO_FETCH2_FORWARD_DELAY,
            fetch1_to_fetch2_backward_delay: defaults::FETCH1_TO_FETCH2_BACKWARD_DELAY,
            fetch2_to_decode_forward_delay: defaults::FETCH2_TO_DECODE_FORWARD_DELAY,
            decode_to_execute_forward_delay: defaults::DECODE_TO_EXECUTE_FORWARD_DELAY,
            execute_branch_delay: defaults::EXECUTE_BRANCH_DELAY,
            decode_input_width: defaults::DECODE_INPUT_WIDTH,
            enable_idling: false,
            fetch2_input_buffer_size: defaults::INPUT_BUFFER_SIZE,
            decode_input_buffer_size: defaults::INPUT_BUFFER_SIZE,
            execute_input_buffer_size: defaults::INPUT_BUFFER_SIZE,
            fetch_line_bytes: defaults::FETCH_LINE_BYTES,
            icache_latency: defaults::ICACHE_LATENCY,
            execute_latency: defaults::EXECUTE_LATENCY,
            num_functional_units: defaults::NUM_FUNCTIONAL_UNITS,
            predict_jumps: false,
        }
    }
}

/// Fault injection schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultInjectionConfig {
    /// Pipeline register selector: `f1ToF2`, `f2ToD`, `dToE`, `eToF1`, `f2ToF1` or empty.
    #[serde(default, alias = "injectComp")]
    pub inject_comp: String,

    /// Absolute tick at which the bit flip is applied.
    #[serde(default, alias = "injectTime")]
    pub inject_time: Tick,

    /// Bit index within the target payload's serialized image.
    #[serde(default, alias = "injectLoc")]
    pub inject_loc: usize,

    /// Enable the functional-unit injection hook.
    #[serde(default, alias = "injectFaultToFu")]
    pub inject_fu: bool,

    /// Whether the functional-unit hook fires once or every cycle.
    #[serde(default, alias = "fuInjectionMode")]
    pub fu_injection: FuInjectionMode,

    /// Bit index flipped by the functional-unit hook.
    #[serde(default, alias = "fuInjectLoc")]
    pub fu_inject_loc: usize,
}

impl FaultInjectionConfig {
    /// Resolves `inject_comp` to a pipeline register.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownInjectComp`] for a non-empty name that
    /// matches no pipeline register.
    pub fn target(&self) -> Result<Option<Edge>, ConfigError> {
        if self.inject_comp.is_empty() {
            return Ok(None);
        }
        Edge::from_config_name(&self.inject_comp)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownInjectComp(self.inject_comp.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.target()?;
        if self.fu_inject_loc >= 32 {
            return Err(ConfigError::InvalidParameter {
                param: "fuInjectLoc",
                value: self.fu_inject_loc as u64,
                reason: "< 32",
            });
        }
        Ok(())
    }
}
