//! Configuration error definitions.
//!
//! Every problem detected while loading a configuration or a program, or
//! while validating a configuration, is reported through [`ConfigError`].
//! Pipeline construction refuses to proceed on any of them; the binary turns
//! them into a fatal exit.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a simulator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric parameter is outside its legal range.
    ///
    /// `param` is the camelCase parameter name so the message can
    /// be matched against existing configuration scripts.
    #[error("{param} must be {reason} ({value})")]
    InvalidParameter {
        /// Parameter name, e.g. `executeBranchDelay`.
        param: &'static str,
        /// Offending value.
        value: u64,
        /// Human-readable constraint, e.g. `>= 1`.
        reason: &'static str,
    },

    /// `injectComp` names no known pipeline register.
    #[error("injectComp must be one of f1ToF2, f2ToD, dToE, eToF1, f2ToF1 or empty (got {0:?})")]
    UnknownInjectComp(String),

    /// The configuration text is not valid JSON for [`crate::config::Config`].
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A program file line is neither a hex word, an `@` base address nor a comment.
    #[error("{}:{line}: {reason} ({text:?})", path.display())]
    Program {
        /// Program file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
        /// What was expected.
        reason: &'static str,
    },

    /// A configuration or program file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Shorthand for the common "must be >= 1" violation.
    pub(crate) fn at_least_one(param: &'static str, value: u64) -> Self {
        Self::InvalidParameter {
            param,
            value,
            reason: ">= 1",
        }
    }
}
