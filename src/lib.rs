//! Crate root: public surface and core type aliases.
//!
//! This crate is a streaming operator DAG engine for incremental numerical
//! computation over time-ordered data: a topologically-ordered dependency
//! graph, a streaming execution engine that evaluates it one tick at a
//! time, and a window/aggregation executor for the "many rows reduce to one
//! window" pattern.
//!
//! ## Invariants
//!
//! - **No dynamic topology changes.** Once an [`Engine`] has been built via
//!   [`EngineBuilder`], its node set and dependency edges are fixed for its
//!   lifetime.
//! - **Strict tick order.** `Engine::step` rejects any tick not strictly
//!   greater than the previous one; out-of-order or duplicate ticks are a
//!   caller error, not something the engine reorders for you.
//! - **No diagnostic output from the core.** This crate never logs,
//!   traces, or prints. Failures are always returned as `Result`;
//!   integration layers (see `src/bin/demo.rs`) own logging.
//! - **Single-threaded, synchronous evaluation.** There is no async runtime
//!   dependency anywhere in this crate. Parallelism, where it makes sense
//!   (independent aggregation-executor groups), is left to the caller.
//!
//! Most of this crate forbids `unsafe_code` at the module level; the one
//! exception is [`agg_exec`], whose [`Aggregator`] contract is defined in
//! terms of raw column pointers (see that module's docs for why).

#![deny(missing_docs, rust_2018_idioms)]

/// The dependency DAG: stable node ids, predecessor lists, reachability
/// queries.
pub mod dag;
/// Crate-wide error taxonomy, one `thiserror` enum per fallible subsystem.
pub mod error;
/// Bounded FIFO history of per-step output rows (ring buffer and deque
/// implementations).
pub mod history;
/// The operator contract and the built-in passthrough root operator.
pub mod op;
/// The window contract and window-emission spec.
pub mod window;
/// The aggregator contract.
pub mod aggregator;
/// Validates operator additions and freezes an [`Engine`]'s layout.
pub mod builder;
/// The streaming execution engine.
pub mod engine;
/// The window + aggregation executor, independent of [`Engine`].
pub mod agg_exec;
/// The `Tick` bound the engine is generic over, plus ready-made tick types.
pub mod tick;
/// Small ordered-container utilities (`SortedVec`, `FlatMultivec`).
pub mod util;

pub use aggregator::Aggregator;
pub use agg_exec::{AggExecSpec, AggExecutor, GroupId};
pub use builder::{EngineBuilder, HistoryNew};
pub use dag::{Dag, DagStats, NodeId};
pub use engine::Engine;
pub use error::{AggExecError, BuildError, DagError, HistoryError, StepError};
pub use history::{DequeHistory, History, RingHistory};
pub use op::{Operator, PassthroughOperator};
pub use tick::{FloatTick, Tick};
pub use util::{FlatMultivec, SortedVec};
pub use window::{Window, WindowSpec};
