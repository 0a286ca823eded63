//! Error taxonomy: one `thiserror`-derived enum per fallible subsystem.
//!
//! The core never logs or retries on its own (see the crate-level docs on
//! error propagation); callers convert these into their own error type or
//! fold them into `anyhow::Error` at a binary's boundary.

#![forbid(unsafe_code)]

use crate::dag::NodeId;

/// Failures growing or indexing the history buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Doubling the ring buffer's capacity would overflow `usize`.
    #[error("history capacity overflow: current capacity {current} cannot be doubled")]
    Alloc {
        /// The capacity that could not be doubled.
        current: usize,
    },
}

/// Failures building or querying the dependency DAG.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    /// A predecessor id was not strictly less than the node being added.
    #[error("invalid dependency: predecessor {bad} is not less than the new node id {next_id}")]
    InvalidDependency {
        /// The offending predecessor id.
        bad: NodeId,
        /// The id the new node would have received.
        next_id: NodeId,
    },
}

/// Failures adding operators to, or finishing, an [`crate::EngineBuilder`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A predecessor id referenced a node that does not (yet) exist.
    #[error("invalid dependency: predecessor {bad} is not less than the new node id {next_id}")]
    InvalidDependency {
        /// The offending predecessor id.
        bad: NodeId,
        /// The id the new node would have received.
        next_id: NodeId,
    },
    /// The number of predecessor ids did not match the operator's declared
    /// `num_depends()`.
    #[error("arity mismatch: operator expects {expected} dependencies, got {got}")]
    ArityMismatch {
        /// What the operator declared via `num_depends()`.
        expected: usize,
        /// What was actually passed to `add_op`.
        got: usize,
    },
    /// `build()` was called without ever adding an operator beyond the root.
    #[error("cannot build an engine with no operators")]
    EmptyBuild,
}

/// Failures stepping the streaming engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The row passed to `step` did not match the root input's arity.
    #[error("input arity mismatch: expected {expected} columns, got {got}")]
    InputArityMismatch {
        /// The root input's declared arity.
        expected: usize,
        /// The row's actual length.
        got: usize,
    },
    /// `step` was called with a tick not strictly greater than the previous
    /// one.
    #[error("non-monotonic tick: previous step was at {prev:?}, got {got:?}")]
    NonMonotonicTick {
        /// The previous step's tick, rendered via `Debug`.
        prev: String,
        /// The rejected tick, rendered via `Debug`.
        got: String,
    },
}

/// Failures constructing or driving the aggregation executor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AggExecError {
    /// An aggregator's column binding referenced a column index `>= C`.
    #[error("aggregator {aggregator} references column {col}, but only {num_columns} columns exist")]
    ColumnOutOfRange {
        /// Index of the offending aggregator within the spec.
        aggregator: usize,
        /// The out-of-range column index.
        col: usize,
        /// Total number of declared columns.
        num_columns: usize,
    },
    /// An aggregator's column binding length did not match `num_inputs()`.
    #[error("aggregator {aggregator} expects {expected} input columns, got {got}")]
    ArityMismatch {
        /// Index of the offending aggregator within the spec.
        aggregator: usize,
        /// What the aggregator declared via `num_inputs()`.
        expected: usize,
        /// What was bound in the spec.
        got: usize,
    },
    /// The spec declared zero groups.
    #[error("aggregation executor requires at least one group")]
    ZeroGroups,
}
