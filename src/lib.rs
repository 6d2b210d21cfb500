// Repquast - quality evaluation for clustered immune repertoires
// Global clippy configuration

#![warn(clippy::all)]
#![warn(clippy::correctness)]
#![warn(clippy::suspicious)]
#![warn(clippy::perf)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_lines)]

pub mod bio;
pub mod config;
pub mod matching;
pub mod partition;
pub mod pipeline;
pub mod reconstruct;
pub mod report;
pub mod stats;
pub mod tools;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepquastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    #[error("{tool} failed (exit code {code:?}): {command}")]
    ExternalTool {
        tool: String,
        command: String,
        code: Option<i32>,
    },

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RepquastError>;
